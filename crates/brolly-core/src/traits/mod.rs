pub mod store;

pub use store::{ActivityLog, ItemStore, LendingStore};
