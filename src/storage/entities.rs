use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

pub type EntryId = i64;

/// A row of the activity log. Entries are only ever appended; the latest one may still be open
/// (`current`), in which case its `duration` is refreshed until it gets finished.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct ActivityEntry {
    pub id: EntryId,
    pub name: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub started: DateTime<Utc>,
    #[serde(with = "duration_ser")]
    pub duration: Duration,
    pub current: bool,
}

impl ActivityEntry {
    /// Moment the entry was touched last. For an open entry this is the last refresh.
    pub fn updated(&self) -> DateTime<Utc> {
        self.started + self.duration
    }
}

/// Values for a newly appended entry. New entries are always open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub name: String,
    pub started: DateTime<Utc>,
    pub duration: Duration,
}

/// Mutable part of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryUpdate {
    pub name: String,
    pub duration: Duration,
    pub current: bool,
}

mod duration_ser {
    use chrono::Duration;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = i64::deserialize(deserializer)?;
        Ok(Duration::seconds(s))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::ActivityEntry;

    #[test]
    fn entry_serializes_seconds() -> anyhow::Result<()> {
        let entry = ActivityEntry {
            id: 3,
            name: "writing".into(),
            started: Utc.timestamp_opt(1_530_662_400, 0).unwrap(),
            duration: Duration::seconds(90),
            current: false,
        };

        let json = serde_json::to_string(&entry)?;
        assert_eq!(
            json,
            r#"{"id":3,"name":"writing","started":1530662400,"duration":90,"current":false}"#
        );
        assert_eq!(serde_json::from_str::<ActivityEntry>(&json)?, entry);
        assert_eq!(entry.updated(), entry.started + Duration::seconds(90));
        Ok(())
    }
}
