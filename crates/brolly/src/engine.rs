//! The lending state machine.
//!
//! Each item is either `Available` or `Borrowed`; the engine is the only
//! writer of item records and activity entries. A transition is one logical
//! unit from the caller's perspective: validate, write the item, append the
//! matching activity. The two writes are separate round trips (neither
//! backend has a multi-record transaction), so a failure between them
//! surfaces as [`LendingError::BackendUnavailable`] and the caller should
//! re-read authoritative state rather than assume either outcome.
//!
//! # Concurrency
//!
//! Same-item transitions are serialized in-process by striped locks held
//! across the whole read-validate-write sequence. Writers in *other*
//! processes are not excluded: the contract is check-then-write, and the
//! loser of a cross-process race observes `Conflict` on a later read rather
//! than being blocked up front.

use std::sync::Arc;

use chrono::Utc;

use brolly_core::{
    error::{LendingError, Result},
    traits::LendingStore,
    types::{Activity, ActivityKind, Item, ItemNumber, ItemPatch, Location, NewActivity, PoolStats},
    PoolConfig, UNKNOWN_ACTOR,
};

use crate::locks::ItemLocks;

/// Number of digits a contact number must have.
pub const CONTACT_DIGITS: usize = 10;

/// Caller-supplied fields for a borrow transition.
#[derive(Debug, Clone)]
pub struct BorrowRequest {
    pub borrower: String,
    pub contact: String,
    pub location: Location,
}

/// Borrow/return state machine over any [`LendingStore`] backend.
pub struct LendingEngine<S: LendingStore + ?Sized> {
    store: Arc<S>,
    config: PoolConfig,
    locks: ItemLocks,
}

impl<S: LendingStore + ?Sized> LendingEngine<S> {
    pub fn new(store: Arc<S>, config: PoolConfig) -> Self {
        Self {
            store,
            config,
            locks: ItemLocks::default(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Every item, ordered by number ascending (bootstraps an empty pool).
    pub fn items(&self) -> Result<Vec<Item>> {
        self.store.all_items()
    }

    pub fn item(&self, number: ItemNumber) -> Result<Item> {
        self.store
            .item_by_number(number)?
            .ok_or(LendingError::NotFound(number))
    }

    /// Add a single item record. The number must lie inside the pool range.
    pub fn create_item(&self, number: ItemNumber) -> Result<Item> {
        if number < 1 || number > self.config.pool_size {
            return Err(LendingError::invalid(format!(
                "item number {number} outside pool range 1..={}",
                self.config.pool_size
            )));
        }
        self.store.create_item(number)
    }

    /// Available → Borrowed.
    ///
    /// Fails with `NotFound` for an unknown item, `Conflict` when the item
    /// is already out, and `InvalidInput` for a blank borrower name or a
    /// malformed contact number, all before anything is written.
    pub fn borrow(&self, number: ItemNumber, request: BorrowRequest) -> Result<Item> {
        validate_actor_name(&request.borrower)?;
        validate_contact(&request.contact)?;

        let _guard = self.locks.lock(number);

        let current = self.item(number)?;
        if current.is_borrowed() {
            return Err(LendingError::conflict(format!(
                "item {number} is already borrowed"
            )));
        }

        let patch = ItemPatch::borrowed(
            request.borrower.clone(),
            request.contact,
            request.location,
            Utc::now(),
        );
        let updated = self.store.upsert_item(number, &patch)?;

        self.store.append_activity(NewActivity {
            kind: ActivityKind::Borrow,
            item_number: number,
            actor_name: request.borrower,
            location: request.location,
        })?;

        tracing::info!(item = number, location = %request.location, "item borrowed");
        Ok(updated)
    }

    /// Borrowed → Available.
    ///
    /// Clears every borrow field, records the return location/time, and
    /// appends a `return` activity carrying the borrower name captured just
    /// before the record was cleared.
    pub fn return_item(&self, number: ItemNumber, location: Location) -> Result<Item> {
        let _guard = self.locks.lock(number);

        let current = self.item(number)?;
        if current.is_available() {
            return Err(LendingError::conflict(format!(
                "item {number} is not borrowed"
            )));
        }

        let actor_name = current
            .borrower
            .clone()
            .unwrap_or_else(|| UNKNOWN_ACTOR.to_string());

        let patch = ItemPatch::returned(location, Utc::now());
        let updated = self.store.upsert_item(number, &patch)?;

        self.store.append_activity(NewActivity {
            kind: ActivityKind::Return,
            item_number: number,
            actor_name,
            location,
        })?;

        tracing::info!(item = number, location = %location, "item returned");
        Ok(updated)
    }

    /// The persisted activity window, most recent first.
    pub fn activities(&self) -> Result<Vec<Activity>> {
        self.store.recent_activities(self.config.activity_window)
    }

    pub fn recent_activities(&self, limit: usize) -> Result<Vec<Activity>> {
        self.store.recent_activities(limit)
    }

    pub fn stats(&self) -> Result<PoolStats> {
        Ok(PoolStats::from_items(&self.items()?))
    }

    /// (Re)create the full pool, all items available.
    pub fn initialize(&self) -> Result<()> {
        self.store.initialize_all()
    }

    /// Wipe items and activities and recreate a fresh pool.
    pub fn reset(&self) -> Result<()> {
        tracing::warn!("resetting lending pool");
        self.store.reset()
    }
}

fn validate_actor_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LendingError::invalid("borrower name must not be empty"));
    }
    Ok(())
}

fn validate_contact(contact: &str) -> Result<()> {
    if contact.len() != CONTACT_DIGITS || !contact.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LendingError::invalid(format!(
            "contact must be exactly {CONTACT_DIGITS} digits"
        )));
    }
    Ok(())
}
