//! Personal activity tracker. Activities are kept in an append-only SQLite log, the newest entry
//! is the current activity while it's open and fresh, and a small daemon keeps it fresh and
//! reminds about breaks.
//!

pub mod activity;
pub mod cli;
pub mod daemon;
pub mod error;
pub mod external;
pub mod storage;
pub mod utils;
