//! Table definitions for the relational adapter.
//!
//! Items are keyed by their pool number; activities carry an AUTOINCREMENT
//! `seq` column that provides the explicit insertion order used to break
//! timestamp ties. All timestamps are stored as RFC 3339 text.

use brolly_core::error::{LendingError, Result};
use rusqlite::Connection;

pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            item_number INTEGER PRIMARY KEY,
            status TEXT NOT NULL DEFAULT 'available',
            borrower TEXT,
            borrower_contact TEXT,
            borrow_location TEXT,
            borrowed_at TEXT,
            return_location TEXT,
            returned_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS activities (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            item_number INTEGER NOT NULL,
            actor_name TEXT NOT NULL,
            location TEXT NOT NULL,
            at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_activities_at
            ON activities(at DESC, seq DESC);
        "#,
    )
    .map_err(LendingError::backend)?;

    Ok(())
}
