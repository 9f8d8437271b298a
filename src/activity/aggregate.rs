use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use now::DateTimeNow;
use tracing::trace;

use crate::{
    error::StoreError,
    storage::{entities::ActivityEntry, log_store::LogStore},
};

use super::{Activity, EXPIRATION_WINDOW};

/// How many of the newest entries [active_duration] looks at. Longer runs are undercounted.
pub const ACTIVE_RUN_LOOKBACK: usize = 100;

/// Decides whether `current` (older) belongs to the same run of work as `previous` (the entry
/// right after it). Without a previous entry, the run only exists if the newest entry isn't
/// expired.
pub fn continues_active_run(previous: Option<&Activity>, current: &Activity) -> bool {
    match previous {
        None => !current.is_expired(),
        Some(previous) => previous.started() - current.updated() <= EXPIRATION_WINDOW,
    }
}

/// Sums durations of entries, newest first, until the first break in tracking. This is how long
/// the user has been working without a pause, not the lifetime total.
pub fn active_duration(
    entries: impl IntoIterator<Item = ActivityEntry>,
    now: DateTime<Utc>,
) -> Duration {
    let mut total = Duration::zero();
    let mut previous: Option<Activity> = None;
    for entry in entries {
        let current = Activity::new(Some(entry), now);
        if !continues_active_run(previous.as_ref(), &current) {
            trace!("Active run stops before {:?}", current.entry());
            break;
        }
        total += current.duration();
        previous = Some(current);
    }
    total
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTotal {
    pub name: String,
    pub duration: Duration,
}

/// Time spent on each activity during a single local day, ordered by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub totals: Vec<NameTotal>,
}

impl DailyTotals {
    pub fn total(&self) -> Duration {
        self.totals
            .iter()
            .fold(Duration::zero(), |sum, v| sum + v.duration)
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// Groups entries started during the local day of `day` by name. The open entry counts with its
/// live duration.
pub fn daily_totals(
    store: &impl LogStore,
    day: DateTime<Local>,
    now: DateTime<Utc>,
) -> Result<DailyTotals, StoreError> {
    let from = day.beginning_of_day().with_timezone(&Utc);
    let to = day.end_of_day().with_timezone(&Utc);
    let entries = store.started_between(from, to)?;
    Ok(group_by_name(day.date_naive(), entries, now))
}

fn group_by_name(
    date: NaiveDate,
    entries: impl IntoIterator<Item = ActivityEntry>,
    now: DateTime<Utc>,
) -> DailyTotals {
    let mut map = BTreeMap::<String, Duration>::new();
    for entry in entries {
        let activity = Activity::new(Some(entry), now);
        *map.entry(activity.name().to_string())
            .or_insert_with(Duration::zero) += activity.duration();
    }
    DailyTotals {
        date,
        totals: map
            .into_iter()
            .map(|(name, duration)| NameTotal { name, duration })
            .collect(),
    }
}
