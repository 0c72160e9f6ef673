//! NoteSage Store: SQLite persistence for notes, attachments, users and sessions.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::SqliteStore;
pub use types::*;
