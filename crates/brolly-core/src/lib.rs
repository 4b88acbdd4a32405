//! Brolly core: types and contract for the lending subsystem
//!
//! This crate defines the shared abstractions for a lending pool of
//! numbered items:
//! - Item and activity types with their state invariants
//! - The backend contract ([`ItemStore`] + [`ActivityLog`]) implemented by
//!   the realtime and relational adapters
//! - The error taxonomy every layer speaks
//! - Pool and backend configuration
//!
//! The state machine that drives borrow/return transitions lives in the
//! `brolly` facade crate; this crate stays free of backend-specific
//! mechanics so the engine can be tested against any adapter.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{PoolConfig, RelationalConfig, SynchronousMode};
pub use error::{LendingError, Result};
pub use traits::{ActivityLog, ItemStore, LendingStore};
pub use types::{
    Activity, ActivityKind, Item, ItemNumber, ItemPatch, ItemStatus, Location, NewActivity, Patch,
    PoolStats, UNKNOWN_ACTOR,
};
