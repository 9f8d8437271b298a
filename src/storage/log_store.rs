use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::error::StoreError;

use super::{
    entities::{ActivityEntry, EntryId, EntryUpdate, NewEntry},
    schema::{CREATE_LOG, CREATE_VIEWS, SELECT_COLUMNS},
};

/// Interface of the activity ledger. Every query returns entries ordered newest first.
pub trait LogStore {
    /// Appends a new open entry. Fails if the entry starts before the end of any stored entry or
    /// if another entry is still open.
    fn append(&mut self, entry: NewEntry) -> Result<EntryId, StoreError>;

    fn latest(&self) -> Result<Option<ActivityEntry>, StoreError>;

    /// Returns whether the entry existed.
    fn update(&mut self, id: EntryId, update: EntryUpdate) -> Result<bool, StoreError>;

    /// Returns whether the entry existed.
    fn delete(&mut self, id: EntryId) -> Result<bool, StoreError>;

    fn recent(&self, limit: usize) -> Result<Vec<ActivityEntry>, StoreError>;

    /// Entries started in the inclusive range.
    fn started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ActivityEntry>, StoreError>;

    /// Distinct names, most recently used first.
    fn names(&self) -> Result<Vec<String>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;

    /// Runs `operation` as a single read-modify-write. Nothing is persisted if it fails.
    fn atomically<T, E>(&mut self, operation: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>;
}

/// The main realization of [LogStore] backed by a SQLite file.
pub struct SqliteLogStore {
    conn: Connection,
}

impl SqliteLogStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        debug!("Opening log store {path:?}");
        Self::initialize(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(CREATE_LOG)?;
        let store = Self { conn };
        store.refresh_views()?;
        Ok(store)
    }

    /// Recreates the derived views used by the database console.
    pub fn refresh_views(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(CREATE_VIEWS)?;
        Ok(())
    }

    fn query(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<ActivityEntry>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, RawEntry::from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(ActivityEntry::try_from(row?)?);
        }
        Ok(entries)
    }
}

impl LogStore for SqliteLogStore {
    fn append(&mut self, entry: NewEntry) -> Result<EntryId, StoreError> {
        self.conn.execute(
            "INSERT INTO log (name, started, duration) VALUES (?1, ?2, ?3)",
            params![
                entry.name,
                entry.started.timestamp(),
                entry.duration.num_seconds()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn latest(&self) -> Result<Option<ActivityEntry>, StoreError> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} ORDER BY started DESC LIMIT 1"),
                [],
                RawEntry::from_row,
            )
            .optional()?;
        raw.map(ActivityEntry::try_from).transpose()
    }

    fn update(&mut self, id: EntryId, update: EntryUpdate) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            "UPDATE log SET name = ?1, duration = ?2, current = ?3 WHERE id = ?4",
            params![
                update.name,
                update.duration.num_seconds(),
                update.current.then_some(1),
                id
            ],
        )?;
        Ok(changed != 0)
    }

    fn delete(&mut self, id: EntryId) -> Result<bool, StoreError> {
        let changed = self.conn.execute("DELETE FROM log WHERE id = ?1", [id])?;
        Ok(changed != 0)
    }

    fn recent(&self, limit: usize) -> Result<Vec<ActivityEntry>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query(
            &format!("{SELECT_COLUMNS} ORDER BY started DESC LIMIT ?1"),
            [limit],
        )
    }

    fn started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ActivityEntry>, StoreError> {
        self.query(
            &format!("{SELECT_COLUMNS} WHERE started BETWEEN ?1 AND ?2 ORDER BY started DESC"),
            [from.timestamp(), to.timestamp()],
        )
    }

    fn names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM log GROUP BY name ORDER BY MAX(started) DESC")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM log", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn atomically<T, E>(&mut self, operation: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        // IMMEDIATE takes the write lock up front so that a concurrent writer fails before reading
        // a state it is about to change.
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(StoreError::from)?;
        match operation(self) {
            Ok(value) => {
                self.conn
                    .execute_batch("COMMIT")
                    .map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    warn!("Failed to roll back transaction {rollback:?}");
                }
                Err(e)
            }
        }
    }
}

/// Row as it is stored, before timestamps are validated.
struct RawEntry {
    id: EntryId,
    name: String,
    started: i64,
    duration: i64,
    current: Option<i64>,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            started: row.get(2)?,
            duration: row.get(3)?,
            current: row.get(4)?,
        })
    }
}

impl TryFrom<RawEntry> for ActivityEntry {
    type Error = StoreError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        let started = DateTime::from_timestamp(raw.started, 0)
            .ok_or(StoreError::InvalidTimestamp(raw.started))?;
        Ok(ActivityEntry {
            id: raw.id,
            name: raw.name,
            started,
            duration: Duration::seconds(raw.duration),
            current: raw.current.is_some(),
        })
    }
}
