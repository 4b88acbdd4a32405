//! Real-time backend adapter
//!
//! Implements the `ItemStore` + `ActivityLog` contract against in-process
//! state and pushes a full snapshot of the changed resource to every
//! subscriber after each successful write. The snapshot-not-diff shape means
//! observers need no replay logic: whatever arrives last is the state.

pub mod hub;
pub mod store;

pub use hub::{ChangeHub, Snapshot, SubscriptionId, Topic};
pub use store::RealtimeStore;
