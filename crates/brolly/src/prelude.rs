//! Convenience re-exports for typical callers.

pub use crate::engine::{BorrowRequest, LendingEngine};
pub use brolly_core::{
    Activity, ActivityKind, ActivityLog, Item, ItemNumber, ItemStatus, ItemStore, LendingError,
    LendingStore, Location, PoolConfig, PoolStats, Result,
};
pub use brolly_realtime::RealtimeStore;
pub use brolly_sqlite::RelationalStore;
