use chrono::{DateTime, Duration, Local, Utc};
use tracing::{debug, info, instrument};

use crate::{
    error::{StoreError, TrackerError},
    storage::{
        entities::{EntryUpdate, NewEntry},
        log_store::LogStore,
    },
    utils::clock::Clock,
};

use super::{
    aggregate::{self, DailyTotals},
    Activity,
};

/// Owner of the log. Every operation is a single read-modify-write against the store.
pub struct Tracker<S: LogStore> {
    store: S,
    clock: Box<dyn Clock>,
}

impl<S: LogStore> Tracker<S> {
    pub fn new(store: S, clock: Box<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn latest(&self) -> Result<Activity, StoreError> {
        super::latest(&self.store, self.clock.now())
    }

    /// Starts a new activity `shift` ago, finishing the current one. Starting the activity that is
    /// already being tracked is refused with [TrackerError::AlreadyTracking].
    #[instrument(skip(self))]
    pub fn start(&mut self, name: &str, shift: Duration) -> Result<(), TrackerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::EmptyName);
        }
        if shift < Duration::zero() {
            return Err(TrackerError::NegativeShift);
        }
        let now = self.clock.now();
        let started = now
            .checked_sub_signed(shift)
            .ok_or(TrackerError::ShiftOutOfRange(shift))?;

        self.store.atomically(|store| {
            let activity = super::latest(&*store, now)?;
            if activity.is_active() && activity.name() == name {
                return Err(TrackerError::AlreadyTracking(name.to_string()));
            }
            update_latest(store, now, None, true)?;
            let id = store.append(NewEntry {
                name: name.to_string(),
                started,
                duration: shift,
            })?;
            info!("Started activity {name:?} with id {id}");
            Ok(())
        })
    }

    /// Refreshes the duration of the current activity, renaming it when `name` is given and
    /// finishing it when `finish` is set. Returns whether there was a current activity.
    #[instrument(skip(self))]
    pub fn update_if_exists(
        &mut self,
        name: Option<&str>,
        finish: bool,
    ) -> Result<bool, TrackerError> {
        let now = self.clock.now();
        self.store
            .atomically(|store| update_latest(store, now, name, finish))
    }

    pub fn update(&mut self, name: Option<&str>, finish: bool) -> Result<(), TrackerError> {
        if self.update_if_exists(name, finish)? {
            Ok(())
        } else {
            Err(TrackerError::NoCurrentActivity)
        }
    }

    pub fn finish(&mut self) -> Result<(), TrackerError> {
        self.update(None, true)
    }

    /// Deletes the current activity as if it never happened. Returns whether anything was
    /// deleted.
    #[instrument(skip(self))]
    pub fn reject(&mut self) -> Result<bool, TrackerError> {
        let now = self.clock.now();
        self.store.atomically(|store| {
            let activity = super::latest(&*store, now)?;
            match activity.id() {
                Some(id) if activity.is_active() => {
                    info!("Rejecting activity {:?}", activity.name());
                    Ok(store.delete(id)?)
                }
                _ => Ok(false),
            }
        })
    }

    /// Continuous active time up to now, see [aggregate::active_duration].
    pub fn active_duration(&self) -> Result<Duration, StoreError> {
        let entries = self.store.recent(aggregate::ACTIVE_RUN_LOOKBACK)?;
        Ok(aggregate::active_duration(entries, self.clock.now()))
    }

    /// Totals for the local calendar day containing `day`.
    pub fn daily_totals(&self, day: DateTime<Local>) -> Result<DailyTotals, StoreError> {
        aggregate::daily_totals(&self.store, day, self.clock.now())
    }

    /// Names used so far, most recent first.
    pub fn names(&self) -> Result<Vec<String>, StoreError> {
        self.store.names()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Reconciles the newest entry with `now`. Expired entries only lose their open flag; their
/// duration stays at the last refresh.
fn update_latest(
    store: &mut impl LogStore,
    now: DateTime<Utc>,
    name: Option<&str>,
    finish: bool,
) -> Result<bool, TrackerError> {
    let activity = super::latest(&*store, now)?;
    let Some(entry) = activity.entry() else {
        return Ok(false);
    };

    if activity.is_expired() {
        if entry.current {
            debug!("Closing expired activity {:?}", entry.name);
            store.update(
                entry.id,
                EntryUpdate {
                    name: entry.name.clone(),
                    duration: entry.duration,
                    current: false,
                },
            )?;
        }
        return Ok(false);
    }
    if !activity.is_active() {
        return Ok(false);
    }

    let name = match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => entry.name.clone(),
    };
    let updated = store.update(
        entry.id,
        EntryUpdate {
            name,
            duration: now - entry.started,
            current: !finish,
        },
    )?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::Duration;

    use crate::{
        activity::test_support::at,
        error::{StoreError, TrackerError},
        storage::log_store::{LogStore, SqliteLogStore},
        utils::clock::ManualClock,
    };

    use super::Tracker;

    fn tracker() -> Result<(Tracker<SqliteLogStore>, ManualClock)> {
        let clock = ManualClock::new(at(0));
        let tracker = Tracker::new(SqliteLogStore::open_in_memory()?, Box::new(clock.clone()));
        Ok((tracker, clock))
    }

    #[test]
    fn test_start_then_finish() -> Result<()> {
        let (mut tracker, clock) = tracker()?;
        tracker.start("writing", Duration::zero())?;
        clock.advance(Duration::minutes(7));

        tracker.update(None, true)?;

        let latest = tracker.latest()?;
        let entry = latest.entry().unwrap();
        assert!(!entry.current);
        assert_eq!(entry.duration, Duration::minutes(7));

        // Finished entries don't change anymore
        clock.advance(Duration::minutes(3));
        assert!(!tracker.update_if_exists(None, false)?);
        assert_eq!(
            tracker.latest()?.entry().unwrap().duration,
            Duration::minutes(7)
        );
        Ok(())
    }

    #[test]
    fn test_same_activity_is_kept() -> Result<()> {
        let (mut tracker, clock) = tracker()?;
        tracker.start("a", Duration::zero())?;
        clock.advance(Duration::seconds(5));

        let result = tracker.start("a", Duration::zero());

        assert!(matches!(result, Err(TrackerError::AlreadyTracking(_))));
        assert!(result.unwrap_err().is_soft());
        assert_eq!(tracker.store().count()?, 1);
        Ok(())
    }

    #[test]
    fn test_start_finishes_previous_activity() -> Result<()> {
        let (mut tracker, clock) = tracker()?;
        tracker.start("a", Duration::zero())?;
        clock.advance(Duration::minutes(4));

        tracker.start("b", Duration::zero())?;

        let entries = tracker.store().recent(10)?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "b");
        assert!(entries[0].current);
        assert_eq!(entries[1].name, "a");
        assert!(!entries[1].current);
        assert_eq!(entries[1].duration, Duration::minutes(4));
        Ok(())
    }

    #[test]
    fn test_shift_backdates_start() -> Result<()> {
        let (mut tracker, clock) = tracker()?;
        clock.advance(Duration::minutes(30));

        tracker.start("reading", Duration::minutes(10))?;

        let entry = tracker.latest()?.entry().cloned().unwrap();
        assert_eq!(entry.started, at(20));
        assert_eq!(entry.duration, Duration::minutes(10));
        assert_eq!(tracker.latest()?.duration(), Duration::minutes(10));
        Ok(())
    }

    #[test]
    fn test_invalid_start_arguments() -> Result<()> {
        let (mut tracker, _) = tracker()?;

        assert!(matches!(
            tracker.start("a", Duration::seconds(-1)),
            Err(TrackerError::NegativeShift)
        ));
        assert!(matches!(
            tracker.start("  ", Duration::zero()),
            Err(TrackerError::EmptyName)
        ));
        assert!(matches!(
            tracker.start("a", Duration::hours(3_000_000_000)),
            Err(TrackerError::ShiftOutOfRange(_))
        ));
        assert_eq!(tracker.store().count()?, 0);
        Ok(())
    }

    #[test]
    fn test_active_duration_looks_back_a_hundred_entries() -> Result<()> {
        let (mut tracker, clock) = tracker()?;
        for i in 0..105 {
            tracker.start(&format!("task {i}"), Duration::zero())?;
            clock.advance(Duration::minutes(1));
        }

        assert_eq!(tracker.store().count()?, 105);
        assert_eq!(tracker.active_duration()?, Duration::minutes(100));
        Ok(())
    }

    #[test]
    fn test_increasing_starts_are_accepted() -> Result<()> {
        let (mut tracker, clock) = tracker()?;
        for name in ["a", "b", "c", "d"] {
            tracker.start(name, Duration::minutes(2))?;
            clock.advance(Duration::minutes(3));
            tracker.finish()?;
            clock.advance(Duration::minutes(5));
        }
        assert_eq!(tracker.store().count()?, 4);
        Ok(())
    }

    #[test]
    fn test_shift_before_previous_end_is_rejected() -> Result<()> {
        let (mut tracker, clock) = tracker()?;
        tracker.start("a", Duration::zero())?;
        clock.advance(Duration::minutes(5));

        let result = tracker.start("b", Duration::minutes(6));

        assert!(matches!(
            result,
            Err(TrackerError::Store(StoreError::OrderingViolation(_)))
        ));
        // The finish of "a" is rolled back together with the insert.
        assert_eq!(tracker.store().count()?, 1);
        assert!(tracker.latest()?.is_active());
        Ok(())
    }

    #[test]
    fn test_start_in_same_second_is_rejected() -> Result<()> {
        let (mut tracker, _) = tracker()?;
        tracker.start("a", Duration::zero())?;

        let result = tracker.start("b", Duration::zero());

        assert!(matches!(
            result,
            Err(TrackerError::Store(StoreError::UniquenessViolation(_)))
        ));
        Ok(())
    }

    #[test]
    fn test_update_renames() -> Result<()> {
        let (mut tracker, clock) = tracker()?;
        tracker.start("a", Duration::zero())?;
        clock.advance(Duration::minutes(2));

        tracker.update(Some("b"), false)?;

        let latest = tracker.latest()?;
        assert_eq!(latest.name(), "b");
        assert!(latest.is_active());
        assert_eq!(latest.entry().unwrap().duration, Duration::minutes(2));

        // Blank names keep the old one
        tracker.update(Some(" "), false)?;
        assert_eq!(tracker.latest()?.name(), "b");
        Ok(())
    }

    #[test]
    fn test_repeated_updates_only_grow() -> Result<()> {
        let (mut tracker, clock) = tracker()?;
        tracker.start("a", Duration::zero())?;
        clock.advance(Duration::minutes(1));

        assert!(tracker.update_if_exists(None, false)?);
        let first = tracker.latest()?.entry().cloned().unwrap();
        assert!(tracker.update_if_exists(None, false)?);
        let second = tracker.latest()?.entry().cloned().unwrap();

        assert_eq!(first.current, second.current);
        assert!(second.duration >= first.duration);
        Ok(())
    }

    #[test]
    fn test_expired_activity_is_closed() -> Result<()> {
        let (mut tracker, clock) = tracker()?;
        tracker.start("a", Duration::zero())?;
        clock.advance(Duration::minutes(3));
        tracker.update_if_exists(None, false)?;
        clock.advance(Duration::minutes(11));

        assert!(!tracker.update_if_exists(None, false)?);

        let entry = tracker.latest()?.entry().cloned().unwrap();
        assert!(!entry.current);
        assert_eq!(entry.duration, Duration::minutes(3));
        assert!(matches!(
            tracker.update(None, true),
            Err(TrackerError::NoCurrentActivity)
        ));
        Ok(())
    }

    #[test]
    fn test_update_without_activity() -> Result<()> {
        let (mut tracker, _) = tracker()?;

        assert!(!tracker.update_if_exists(None, false)?);
        assert!(matches!(
            tracker.finish(),
            Err(TrackerError::NoCurrentActivity)
        ));
        Ok(())
    }

    #[test]
    fn test_reject_removes_only_active_entry() -> Result<()> {
        let (mut tracker, clock) = tracker()?;
        assert!(!tracker.reject()?);

        tracker.start("a", Duration::zero())?;
        clock.advance(Duration::minutes(1));
        tracker.start("b", Duration::zero())?;
        clock.advance(Duration::minutes(1));

        assert!(tracker.reject()?);
        assert_eq!(tracker.store().count()?, 1);

        // "a" is finished, rejecting again does nothing
        assert!(!tracker.reject()?);
        assert_eq!(tracker.store().count()?, 1);
        Ok(())
    }

    #[test]
    fn test_expired_activity_can_be_restarted() -> Result<()> {
        let (mut tracker, clock) = tracker()?;
        tracker.start("a", Duration::zero())?;
        clock.advance(Duration::minutes(30));

        tracker.start("a", Duration::zero())?;

        let entries = tracker.store().recent(10)?;
        assert_eq!(entries.len(), 2);
        assert!(!entries[1].current);
        assert_eq!(entries[1].duration, Duration::zero());
        Ok(())
    }
}
