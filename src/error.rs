//! Error types of the tracking core. Binaries wrap these into [anyhow::Error].

use rusqlite::ErrorCode;

use crate::storage::schema::ORDERING_VIOLATION_MESSAGE;

/// Errors produced by the log store. Constraint violations mean that the caller tried to rewrite
/// history (clock skew, another writer) and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("insert would backdate history: {0}")]
    OrderingViolation(String),

    #[error("log constraint violated: {0}")]
    UniquenessViolation(String),

    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(failure, Some(message))
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                if message.contains(ORDERING_VIOLATION_MESSAGE) {
                    StoreError::OrderingViolation(message.clone())
                } else if message.starts_with("UNIQUE constraint failed") {
                    StoreError::UniquenessViolation(message.clone())
                } else {
                    StoreError::Sqlite(error)
                }
            }
            _ => StoreError::Sqlite(error),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("keep tracking existing activity {0:?}")]
    AlreadyTracking(String),

    #[error("no current activity")]
    NoCurrentActivity,

    #[error("shift cannot be negative")]
    NegativeShift,

    #[error("shift {0} reaches too far into the past")]
    ShiftOutOfRange(chrono::Duration),

    #[error("activity name cannot be empty")]
    EmptyName,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TrackerError {
    /// Soft refusals are reported to the user but don't fail the process.
    pub fn is_soft(&self) -> bool {
        matches!(self, TrackerError::AlreadyTracking(_))
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::ffi;

    use super::*;

    fn constraint_failure(message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_CONSTRAINT_UNIQUE),
            Some(message.to_string()),
        )
    }

    #[test]
    fn classifies_constraint_failures() {
        assert!(matches!(
            StoreError::from(constraint_failure("UNIQUE constraint failed: log.current")),
            StoreError::UniquenessViolation(_)
        ));
        assert!(matches!(
            StoreError::from(constraint_failure("started must be latest")),
            StoreError::OrderingViolation(_)
        ));
        assert!(matches!(
            StoreError::from(constraint_failure("CHECK constraint failed: current IN (1)")),
            StoreError::Sqlite(_)
        ));
        assert!(matches!(
            StoreError::from(rusqlite::Error::QueryReturnedNoRows),
            StoreError::Sqlite(_)
        ));
    }

    #[test]
    fn only_already_tracking_is_soft() {
        assert!(TrackerError::AlreadyTracking("a".into()).is_soft());
        assert!(!TrackerError::NoCurrentActivity.is_soft());
        assert!(!TrackerError::NegativeShift.is_soft());
    }
}
