//! Relational backend adapter
//!
//! Implements the `ItemStore` + `ActivityLog` contract against SQLite.
//! Unlike the real-time adapter nothing is pushed to observers; callers
//! poll with discrete request/response reads, and ordering comes from an
//! explicit sequence column rather than push delivery.

pub mod schema;
pub mod store;

pub use store::RelationalStore;
