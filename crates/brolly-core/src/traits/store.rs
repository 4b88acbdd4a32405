//! Backend contract implemented by every storage adapter.
//!
//! Two adapters ship with the workspace: a push-based in-process store
//! (`brolly-realtime`) and a request/response SQLite store
//! (`brolly-sqlite`). The lending engine depends only on these traits, so
//! either backend can serve identical semantics to the same caller logic.

use crate::error::Result;
use crate::types::{Activity, Item, ItemNumber, ItemPatch, NewActivity};

/// One record per loanable item, keyed by item number.
pub trait ItemStore: Send + Sync {
    /// Every item, ordered by item number ascending.
    ///
    /// When the backing store is empty this bootstraps the pool via
    /// [`initialize_all`](Self::initialize_all) and reads again, so callers
    /// never observe a half-provisioned pool.
    fn all_items(&self) -> Result<Vec<Item>>;

    fn item_by_number(&self, number: ItemNumber) -> Result<Option<Item>>;

    /// Create a single available item record. Fails with `Conflict` when
    /// the number is already present.
    fn create_item(&self, number: ItemNumber) -> Result<Item>;

    /// Merge `patch` onto the existing record (which must exist; `NotFound`
    /// otherwise), stamp `updated_at`, and write the full merged record back
    /// as one operation. Fields the patch clears are physically removed,
    /// never left stale.
    fn upsert_item(&self, number: ItemNumber, patch: &ItemPatch) -> Result<Item>;

    /// Deterministically (re)create records `1..=pool_size`, all available,
    /// with fresh creation timestamps. Idempotent: running it twice yields
    /// the same final state.
    fn initialize_all(&self) -> Result<()>;

    /// Remove every item record. Only used as part of a full reset.
    fn clear_items(&self) -> Result<()>;
}

/// Append-only log of borrow/return events.
pub trait ActivityLog: Send + Sync {
    /// Assign an id and timestamp, persist, and return the created entry.
    fn append_activity(&self, entry: NewActivity) -> Result<Activity>;

    /// Most recent entries first, at most `limit` of them. Ordered by
    /// timestamp, ties broken by the backend's insertion sequence.
    fn recent_activities(&self, limit: usize) -> Result<Vec<Activity>>;

    /// Remove every entry. Only used as part of a full reset.
    fn clear_activities(&self) -> Result<()>;
}

/// The full backend contract: items plus their activity log.
pub trait LendingStore: ItemStore + ActivityLog {
    /// Wipe everything and recreate a fresh pool.
    fn reset(&self) -> Result<()> {
        self.clear_activities()?;
        self.clear_items()?;
        self.initialize_all()
    }
}

impl<T: ItemStore + ActivityLog> LendingStore for T {}
