//! Storage is organized through [log_store::SqliteLogStore].
//! The basic idea is:
//!  - There is a single `log` table. Rows are appended and never reordered.
//!  - Only the newest row may be open (`current`). SQLite constraints guard this together with
//!    the ordering of start times, so a second writer fails instead of corrupting the log.
//!  - Views over the table exist only for the database console.

pub mod entities;
pub mod log_store;
pub mod schema;
