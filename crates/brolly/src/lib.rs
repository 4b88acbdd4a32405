//! Brolly: a lending-pool tracker
//!
//! Brolly tracks a fixed pool of numbered loanable items with:
//! - **Lending engine**: the borrow/return state machine and its invariants
//! - **Two interchangeable backends**: a push-based in-process store
//!   (`brolly-realtime`) and a request/response SQLite store
//!   (`brolly-sqlite`), both behind one contract
//! - **Activity log**: append-only record of every transition
//!
//! # Quick Start
//!
//! ```no_run
//! use brolly::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<()> {
//! let store = Arc::new(RealtimeStore::new(PoolConfig::default()));
//! let engine = LendingEngine::new(store, PoolConfig::default());
//!
//! engine.initialize()?;
//! engine.borrow(2, BorrowRequest {
//!     borrower: "Nan".into(),
//!     contact: "0812345678".into(),
//!     location: Location::Cafeteria,
//! })?;
//! engine.return_item(2, Location::Gym)?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod locks;
pub mod prelude;

// Re-export core types
pub use brolly_core::{
    config::{PoolConfig, RelationalConfig, SynchronousMode},
    error::{LendingError, Result},
    traits::{ActivityLog, ItemStore, LendingStore},
    types::{
        Activity, ActivityKind, Item, ItemNumber, ItemPatch, ItemStatus, Location, NewActivity,
        Patch, PoolStats, UNKNOWN_ACTOR,
    },
};

// Re-export implementations
pub use brolly_realtime::{ChangeHub, RealtimeStore, Snapshot, SubscriptionId, Topic};
pub use brolly_sqlite::RelationalStore;

// Re-export main types from this crate
pub use engine::{BorrowRequest, LendingEngine, CONTACT_DIGITS};
pub use locks::ItemLocks;
