//! SQLite-backed store.
//!
//! Request/response semantics: every contract operation is one round trip
//! against a single mutex-guarded connection. Multi-statement operations
//! (initialize, retention pruning) run inside a SQLite transaction, which is
//! stronger than the contract requires but free to provide here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};

use brolly_core::{
    error::{LendingError, Result},
    traits::{ActivityLog, ItemStore},
    types::{Activity, ActivityKind, Item, ItemNumber, ItemPatch, ItemStatus, Location},
    NewActivity, PoolConfig, RelationalConfig, SynchronousMode,
};

use crate::schema;

/// The relational adapter.
pub struct RelationalStore {
    conn: Arc<Mutex<Connection>>,
    pool: PoolConfig,
}

impl RelationalStore {
    /// Open (creating if necessary) the database at `cfg.path`.
    pub fn open(cfg: &RelationalConfig, pool: PoolConfig) -> Result<Self> {
        if let Some(parent) = cfg.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            &cfg.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .map_err(LendingError::backend)?;

        Self::configure_connection(&conn, cfg)?;
        schema::init(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            pool,
        })
    }

    /// Private in-memory database, used by tests and the demo CLI path.
    pub fn open_in_memory(pool: PoolConfig) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(LendingError::backend)?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            pool,
        })
    }

    fn configure_connection(conn: &Connection, cfg: &RelationalConfig) -> Result<()> {
        if cfg.wal_mode {
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(LendingError::backend)?;
        }

        let sync_mode = match cfg.synchronous {
            SynchronousMode::Full => "FULL",
            SynchronousMode::Normal => "NORMAL",
            SynchronousMode::Off => "OFF",
        };
        conn.pragma_update(None, "synchronous", sync_mode)
            .map_err(LendingError::backend)?;

        conn.pragma_update(None, "cache_size", cfg.cache_size)
            .map_err(LendingError::backend)?;

        Ok(())
    }

    fn select_all(&self, conn: &Connection) -> Result<Vec<Item>> {
        let mut stmt = conn
            .prepare(
                "SELECT item_number, status, borrower, borrower_contact, borrow_location,
                        borrowed_at, return_location, returned_at, created_at, updated_at
                 FROM items ORDER BY item_number ASC",
            )
            .map_err(LendingError::backend)?;

        let items = stmt
            .query_map([], item_from_row)
            .map_err(LendingError::backend)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(LendingError::backend)?;

        Ok(items)
    }

    fn select_one(&self, conn: &Connection, number: ItemNumber) -> Result<Option<Item>> {
        conn.query_row(
            "SELECT item_number, status, borrower, borrower_contact, borrow_location,
                    borrowed_at, return_location, returned_at, created_at, updated_at
             FROM items WHERE item_number = ?",
            params![number],
            item_from_row,
        )
        .optional()
        .map_err(LendingError::backend)
    }

    fn write_full_row(conn: &Connection, item: &Item) -> Result<()> {
        conn.execute(
            "UPDATE items SET status = ?2, borrower = ?3, borrower_contact = ?4,
                    borrow_location = ?5, borrowed_at = ?6, return_location = ?7,
                    returned_at = ?8, updated_at = ?9
             WHERE item_number = ?1",
            params![
                item.item_number,
                status_str(item.status),
                item.borrower,
                item.borrower_contact,
                item.borrow_location.map(|l| l.as_str()),
                item.borrowed_at.map(|t| t.to_rfc3339()),
                item.return_location.map(|l| l.as_str()),
                item.returned_at.map(|t| t.to_rfc3339()),
                item.updated_at.to_rfc3339(),
            ],
        )
        .map_err(LendingError::backend)?;
        Ok(())
    }
}

impl ItemStore for RelationalStore {
    fn all_items(&self) -> Result<Vec<Item>> {
        {
            let conn = self.conn.lock();
            let items = self.select_all(&conn)?;
            if !items.is_empty() {
                return Ok(items);
            }
        }
        tracing::info!(pool_size = self.pool.pool_size, "empty store, bootstrapping pool");
        self.initialize_all()?;
        let conn = self.conn.lock();
        self.select_all(&conn)
    }

    fn item_by_number(&self, number: ItemNumber) -> Result<Option<Item>> {
        let conn = self.conn.lock();
        self.select_one(&conn, number)
    }

    fn create_item(&self, number: ItemNumber) -> Result<Item> {
        let conn = self.conn.lock();
        if self.select_one(&conn, number)?.is_some() {
            return Err(LendingError::conflict(format!(
                "item {number} already exists"
            )));
        }

        let item = Item::available(number, Utc::now());
        conn.execute(
            "INSERT INTO items (item_number, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                item.item_number,
                status_str(item.status),
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
            ],
        )
        .map_err(LendingError::backend)?;

        Ok(item)
    }

    fn upsert_item(&self, number: ItemNumber, patch: &ItemPatch) -> Result<Item> {
        let conn = self.conn.lock();
        let mut item = self
            .select_one(&conn, number)?
            .ok_or(LendingError::NotFound(number))?;

        patch.apply(&mut item);
        item.updated_at = Utc::now();
        Self::write_full_row(&conn, &item)?;

        Ok(item)
    }

    fn initialize_all(&self) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(LendingError::backend)?;

        tx.execute("DELETE FROM items", [])
            .map_err(LendingError::backend)?;
        for number in 1..=self.pool.pool_size {
            tx.execute(
                "INSERT INTO items (item_number, status, created_at, updated_at)
                 VALUES (?1, 'available', ?2, ?2)",
                params![number, now],
            )
            .map_err(LendingError::backend)?;
        }

        tx.commit().map_err(LendingError::backend)?;
        tracing::debug!(pool_size = self.pool.pool_size, "pool initialized");
        Ok(())
    }

    fn clear_items(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM items", [])
            .map_err(LendingError::backend)?;
        Ok(())
    }
}

impl ActivityLog for RelationalStore {
    fn append_activity(&self, entry: NewActivity) -> Result<Activity> {
        let now = Utc::now();
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(LendingError::backend)?;

        tx.execute(
            "INSERT INTO activities (kind, item_number, actor_name, location, at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                kind_str(entry.kind),
                entry.item_number,
                entry.actor_name,
                entry.location.as_str(),
                now.to_rfc3339(),
            ],
        )
        .map_err(LendingError::backend)?;
        let seq = tx.last_insert_rowid();

        // Keep only the newest window of entries.
        tx.execute(
            "DELETE FROM activities WHERE seq NOT IN
                 (SELECT seq FROM activities ORDER BY seq DESC LIMIT ?1)",
            params![self.pool.activity_window as i64],
        )
        .map_err(LendingError::backend)?;

        tx.commit().map_err(LendingError::backend)?;

        Ok(Activity {
            id: format_seq(seq),
            kind: entry.kind,
            item_number: entry.item_number,
            actor_name: entry.actor_name,
            location: entry.location,
            timestamp: now,
        })
    }

    fn recent_activities(&self, limit: usize) -> Result<Vec<Activity>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT seq, kind, item_number, actor_name, location, at
                 FROM activities ORDER BY at DESC, seq DESC LIMIT ?1",
            )
            .map_err(LendingError::backend)?;

        let activities = stmt
            .query_map(params![limit as i64], activity_from_row)
            .map_err(LendingError::backend)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(LendingError::backend)?;

        Ok(activities)
    }

    fn clear_activities(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM activities", [])
            .map_err(LendingError::backend)?;
        Ok(())
    }
}

fn status_str(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Available => "available",
        ItemStatus::Borrowed => "borrowed",
    }
}

fn kind_str(kind: ActivityKind) -> &'static str {
    match kind {
        ActivityKind::Borrow => "borrow",
        ActivityKind::Return => "return",
    }
}

/// Zero-padded sequence number: sorts lexicographically in insertion order.
fn format_seq(seq: i64) -> String {
    format!("{seq:012}")
}

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| conversion_err(idx, e)),
        None => Ok(None),
    }
}

fn loc_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Location> {
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_err(idx, e))
}

fn opt_loc_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Location>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(text) => text.parse().map(Some).map_err(|e| conversion_err(idx, e)),
        None => Ok(None),
    }
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let status: String = row.get(1)?;
    let status = match status.as_str() {
        "available" => ItemStatus::Available,
        "borrowed" => ItemStatus::Borrowed,
        other => {
            return Err(conversion_err(
                1,
                LendingError::invalid(format!("unknown status {other:?}")),
            ))
        }
    };

    Ok(Item {
        item_number: row.get(0)?,
        status,
        borrower: row.get(2)?,
        borrower_contact: row.get(3)?,
        borrow_location: opt_loc_col(row, 4)?,
        borrowed_at: opt_ts_col(row, 5)?,
        return_location: opt_loc_col(row, 6)?,
        returned_at: opt_ts_col(row, 7)?,
        created_at: ts_col(row, 8)?,
        updated_at: ts_col(row, 9)?,
    })
}

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    let kind: String = row.get(1)?;
    let kind = match kind.as_str() {
        "borrow" => ActivityKind::Borrow,
        "return" => ActivityKind::Return,
        other => {
            return Err(conversion_err(
                1,
                LendingError::invalid(format!("unknown activity kind {other:?}")),
            ))
        }
    };

    Ok(Activity {
        id: format_seq(row.get(0)?),
        kind,
        item_number: row.get(2)?,
        actor_name: row.get(3)?,
        location: loc_col(row, 4)?,
        timestamp: ts_col(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use brolly_core::LendingStore;
    use tempfile::TempDir;

    fn small_store() -> RelationalStore {
        RelationalStore::open_in_memory(PoolConfig {
            pool_size: 3,
            activity_window: 5,
        })
        .unwrap()
    }

    fn borrow_entry(n: ItemNumber) -> NewActivity {
        NewActivity {
            kind: ActivityKind::Borrow,
            item_number: n,
            actor_name: "Nan".into(),
            location: Location::Cafeteria,
        }
    }

    #[test]
    fn all_items_bootstraps_empty_store() {
        let store = small_store();
        let items = store.all_items().unwrap();
        assert_eq!(
            items.iter().map(|i| i.item_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(items.iter().all(Item::is_available));
    }

    #[test]
    fn initialize_all_is_idempotent() {
        let store = small_store();
        store.initialize_all().unwrap();
        store
            .upsert_item(
                2,
                &ItemPatch::borrowed("Nan".into(), "0812345678".into(), Location::Gym, Utc::now()),
            )
            .unwrap();
        store.initialize_all().unwrap();

        let items = store.all_items().unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(Item::is_available));
        assert!(items.iter().all(Item::is_consistent));
    }

    #[test]
    fn upsert_unknown_item_is_not_found() {
        let store = small_store();
        store.initialize_all().unwrap();
        let err = store.upsert_item(9, &ItemPatch::default()).unwrap_err();
        assert!(matches!(err, LendingError::NotFound(9)));
    }

    #[test]
    fn create_existing_item_conflicts() {
        let store = small_store();
        store.initialize_all().unwrap();
        let err = store.create_item(1).unwrap_err();
        assert!(matches!(err, LendingError::Conflict(_)));
    }

    #[test]
    fn returned_item_has_borrow_columns_nulled() {
        let store = small_store();
        store.initialize_all().unwrap();
        store
            .upsert_item(
                1,
                &ItemPatch::borrowed(
                    "Nan".into(),
                    "0812345678".into(),
                    Location::Cafeteria,
                    Utc::now(),
                ),
            )
            .unwrap();
        store
            .upsert_item(1, &ItemPatch::returned(Location::Gym, Utc::now()))
            .unwrap();

        // Re-read from disk to prove the columns are gone, not stale.
        let item = store.item_by_number(1).unwrap().unwrap();
        assert!(item.is_available());
        assert!(item.is_consistent());
        assert_eq!(item.borrower, None);
        assert_eq!(item.return_location, Some(Location::Gym));
    }

    #[test]
    fn recent_is_most_recent_first_and_bounded() {
        let store = small_store();
        for n in 1..=4 {
            store.append_activity(borrow_entry(n)).unwrap();
        }
        let recent = store.recent_activities(2).unwrap();
        assert_eq!(
            recent.iter().map(|a| a.item_number).collect::<Vec<_>>(),
            vec![4, 3]
        );
    }

    #[test]
    fn equal_timestamps_fall_back_to_sequence_order() {
        let store = small_store();
        let conn = store.conn.lock();
        for n in [1u32, 2, 3] {
            conn.execute(
                "INSERT INTO activities (kind, item_number, actor_name, location, at)
                 VALUES ('borrow', ?1, 'Nan', 'Gym', '2024-05-01T09:30:00+00:00')",
                params![n],
            )
            .unwrap();
        }
        drop(conn);

        let recent = store.recent_activities(10).unwrap();
        assert_eq!(
            recent.iter().map(|a| a.item_number).collect::<Vec<_>>(),
            vec![3, 2, 1]
        );
    }

    #[test]
    fn retention_drops_oldest_entries() {
        let store = small_store();
        for n in 1..=8 {
            store.append_activity(borrow_entry(n)).unwrap();
        }
        let recent = store.recent_activities(50).unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent.last().unwrap().item_number, 4);
    }

    #[test]
    fn reset_recreates_a_fresh_pool() {
        let store = small_store();
        store.initialize_all().unwrap();
        store.append_activity(borrow_entry(1)).unwrap();
        store.reset().unwrap();

        assert_eq!(store.all_items().unwrap().len(), 3);
        assert!(store.recent_activities(50).unwrap().is_empty());
    }

    #[test]
    fn state_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let cfg = RelationalConfig::new(temp.path().join("lending.db"));
        let pool = PoolConfig {
            pool_size: 3,
            activity_window: 5,
        };

        {
            let store = RelationalStore::open(&cfg, pool.clone()).unwrap();
            store.initialize_all().unwrap();
            store
                .upsert_item(
                    2,
                    &ItemPatch::borrowed(
                        "Nan".into(),
                        "0812345678".into(),
                        Location::Dome,
                        Utc::now(),
                    ),
                )
                .unwrap();
        }

        let store = RelationalStore::open(&cfg, pool).unwrap();
        let item = store.item_by_number(2).unwrap().unwrap();
        assert!(item.is_borrowed());
        assert_eq!(item.borrower.as_deref(), Some("Nan"));
    }
}
