//! Everything about the current activity. The log itself never stores which activity is
//! "current"; it's derived from the newest entry, its open flag, and how long ago it was touched.
//!
//!  - [Activity] is a read-only view over the newest entry at a given moment.
//!  - [tracker::Tracker] changes the log: start, update, finish, reject.
//!  - [aggregate] computes continuous active time and daily totals.
//!  - [present] turns an activity into text.

pub mod aggregate;
pub mod present;
pub mod tracker;

use chrono::{DateTime, Duration, Utc};

use crate::{
    error::StoreError,
    storage::{
        entities::{ActivityEntry, EntryId},
        log_store::LogStore,
    },
    utils::time::format_hhmm,
};

/// Open entries untouched for longer than this are considered abandoned.
pub const EXPIRATION_WINDOW: Duration = Duration::minutes(10);

/// An entry as seen at `observed_at`. An empty log gives an empty activity, which is neither active
/// nor expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    entry: Option<ActivityEntry>,
    observed_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(entry: Option<ActivityEntry>, observed_at: DateTime<Utc>) -> Self {
        Self { entry, observed_at }
    }

    pub fn empty(observed_at: DateTime<Utc>) -> Self {
        Self::new(None, observed_at)
    }

    pub fn entry(&self) -> Option<&ActivityEntry> {
        self.entry.as_ref()
    }

    pub fn id(&self) -> Option<EntryId> {
        self.entry.as_ref().map(|v| v.id)
    }

    pub fn name(&self) -> &str {
        self.entry.as_ref().map_or("", |v| v.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.entry.as_ref().map_or(self.observed_at, |v| v.started)
    }

    /// Last moment the entry was touched.
    pub fn updated(&self) -> DateTime<Utc> {
        self.entry
            .as_ref()
            .map_or(self.observed_at, ActivityEntry::updated)
    }

    pub fn is_expired(&self) -> bool {
        self.observed_at - self.updated() > EXPIRATION_WINDOW
    }

    pub fn is_active(&self) -> bool {
        self.entry.as_ref().is_some_and(|v| v.current) && !self.is_expired()
    }

    /// Live duration while active, the stored one otherwise.
    pub fn duration(&self) -> Duration {
        match &self.entry {
            Some(entry) if self.is_active() => self.observed_at - entry.started,
            Some(entry) => entry.duration,
            None => Duration::zero(),
        }
    }

    /// Time since the activity was started when active, or since it was left otherwise.
    pub fn time_since(&self) -> Duration {
        if self.is_active() {
            self.observed_at - self.started()
        } else {
            self.observed_at - self.updated()
        }
    }

    /// Short description like `01:05 writing`, or `00:20 OFF` when nothing is tracked.
    pub fn label(&self) -> String {
        let name = if self.is_active() { self.name() } else { "OFF" };
        format!("{} {name}", format_hhmm(self.time_since()))
    }
}

/// Resolves the newest entry of the log at `now`.
pub fn latest(store: &impl LogStore, now: DateTime<Utc>) -> Result<Activity, StoreError> {
    Ok(Activity::new(store.latest()?, now))
}
