//! Thin wrappers around programs timefor talks to: the notification daemon, an interactive menu
//! and the sqlite3 console. Collaborators with behaviour worth testing are traits so they can be
//! mocked.

pub mod console;
pub mod hook;
pub mod menu;
pub mod notify;
