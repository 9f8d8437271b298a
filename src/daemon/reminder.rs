use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use crate::{
    external::notify::{Notice, Urgency},
    utils::time::format_hhmm,
};

/// Reminders past this share of the break interval are sent as critical.
const OVERDUE_RATIO: f64 = 1.2;

/// Non-critical reminders disappear after this long.
const REMINDER_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Decides when to remind the user about a break. The time of the last reminder lives only in
/// memory, so a restarted daemon may remind right away.
pub struct BreakReminder {
    break_after: Duration,
    repeat_after: Duration,
    last_reminded: Option<DateTime<Utc>>,
}

impl BreakReminder {
    pub fn new(break_after: Duration, repeat_after: Duration) -> Self {
        Self {
            break_after,
            repeat_after,
            last_reminded: None,
        }
    }

    /// Returns a notice if the user has been active for too long and wasn't reminded recently.
    /// The reminder counts as sent once returned, whether or not the notice gets delivered.
    pub fn check(&mut self, active_for: Duration, now: DateTime<Utc>) -> Option<Notice> {
        if active_for <= self.break_after {
            return None;
        }
        if matches!(self.last_reminded, Some(last) if now - last <= self.repeat_after) {
            return None;
        }
        self.last_reminded = Some(now);

        let overdue =
            active_for.num_seconds() as f64 > self.break_after.num_seconds() as f64 * OVERDUE_RATIO;
        Some(Notice {
            title: "Take a break!".into(),
            body: format!("Active for {} already", format_hhmm(active_for)),
            urgency: if overdue {
                Urgency::Critical
            } else {
                Urgency::Normal
            },
            timeout: if overdue { None } else { Some(REMINDER_TIMEOUT) },
        })
    }
}
