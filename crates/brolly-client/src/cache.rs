//! Local mirror of item state for responsive callers.
//!
//! The cache owns no durable state; it is a disposable view rebuilt from any
//! authoritative read or push snapshot. A user-initiated transition is
//! applied to the mirror immediately (with the pre-transition record kept
//! aside), then issued to the engine; success adopts the authoritative
//! record, failure restores the saved record exactly as it was.
//!
//! Only one transition per item may be in flight. A second attempt on the
//! same item is rejected locally before it reaches the engine. This is a
//! cheap early rejection, not a substitute for the engine's own check.

use std::collections::BTreeMap;

use chrono::Utc;

use brolly::engine::{BorrowRequest, LendingEngine};
use brolly_core::{
    error::{LendingError, Result},
    traits::LendingStore,
    types::{Activity, Item, ItemNumber, ItemPatch, Location, PoolStats},
};

/// How many activity entries the mirror keeps for display.
pub const ACTIVITY_DISPLAY_WINDOW: usize = 20;

/// The client-side mirror.
#[derive(Default)]
pub struct ProjectionCache {
    items: BTreeMap<ItemNumber, Item>,
    /// Most recent first, at most [`ACTIVITY_DISPLAY_WINDOW`] entries.
    activities: Vec<Activity>,
    /// Pre-transition records of items with a transition in flight.
    in_flight: BTreeMap<ItemNumber, Item>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull authoritative state through the engine.
    pub fn refresh<S: LendingStore + ?Sized>(&mut self, engine: &LendingEngine<S>) -> Result<()> {
        let items = engine.items()?;
        let activities = engine.recent_activities(ACTIVITY_DISPLAY_WINDOW)?;
        self.apply_items(items);
        self.apply_activities(activities);
        Ok(())
    }

    /// Adopt an authoritative item snapshot (server state wins).
    pub fn apply_items(&mut self, items: Vec<Item>) {
        self.items = items.into_iter().map(|i| (i.item_number, i)).collect();
    }

    /// Adopt an authoritative activity snapshot, keeping the display window.
    pub fn apply_activities(&mut self, mut activities: Vec<Activity>) {
        activities.truncate(ACTIVITY_DISPLAY_WINDOW);
        self.activities = activities;
    }

    pub fn item(&self, number: ItemNumber) -> Option<&Item> {
        self.items.get(&number)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn available_items(&self) -> impl Iterator<Item = &Item> {
        self.items.values().filter(|i| i.is_available())
    }

    pub fn borrowed_items(&self) -> impl Iterator<Item = &Item> {
        self.items.values().filter(|i| i.is_borrowed())
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats::from_items(self.items.values())
    }

    pub fn has_in_flight(&self, number: ItemNumber) -> bool {
        self.in_flight.contains_key(&number)
    }

    /// Start an optimistic borrow: save the current record and show the
    /// post-transition shape immediately.
    pub fn begin_borrow(&mut self, number: ItemNumber, request: &BorrowRequest) -> Result<()> {
        let snapshot = self.begin(number)?;

        let mut optimistic = snapshot;
        ItemPatch::borrowed(
            request.borrower.clone(),
            request.contact.clone(),
            request.location,
            Utc::now(),
        )
        .apply(&mut optimistic);
        self.items.insert(number, optimistic);
        Ok(())
    }

    /// Start an optimistic return.
    pub fn begin_return(&mut self, number: ItemNumber, location: Location) -> Result<()> {
        let snapshot = self.begin(number)?;

        let mut optimistic = snapshot;
        ItemPatch::returned(location, Utc::now()).apply(&mut optimistic);
        self.items.insert(number, optimistic);
        Ok(())
    }

    /// The transition was confirmed: drop the saved record and adopt the
    /// authoritative one.
    pub fn confirm(&mut self, number: ItemNumber, authoritative: Item) {
        self.in_flight.remove(&number);
        self.items.insert(number, authoritative);
    }

    /// The transition failed: restore the saved record exactly.
    pub fn abort(&mut self, number: ItemNumber) {
        if let Some(snapshot) = self.in_flight.remove(&number) {
            tracing::debug!(item = number, "rolling back optimistic transition");
            self.items.insert(number, snapshot);
        }
    }

    /// Optimistic borrow driven to completion against the engine.
    pub fn borrow<S: LendingStore + ?Sized>(
        &mut self,
        engine: &LendingEngine<S>,
        number: ItemNumber,
        request: BorrowRequest,
    ) -> Result<Item> {
        self.begin_borrow(number, &request)?;
        match engine.borrow(number, request) {
            Ok(item) => {
                self.confirm(number, item.clone());
                Ok(item)
            }
            Err(err) => {
                self.abort(number);
                Err(err)
            }
        }
    }

    /// Optimistic return driven to completion against the engine.
    pub fn return_item<S: LendingStore + ?Sized>(
        &mut self,
        engine: &LendingEngine<S>,
        number: ItemNumber,
        location: Location,
    ) -> Result<Item> {
        self.begin_return(number, location)?;
        match engine.return_item(number, location) {
            Ok(item) => {
                self.confirm(number, item.clone());
                Ok(item)
            }
            Err(err) => {
                self.abort(number);
                Err(err)
            }
        }
    }

    /// Guard a new transition: the item must be known locally and must not
    /// already have one in flight. Returns the pre-transition record.
    fn begin(&mut self, number: ItemNumber) -> Result<Item> {
        if self.in_flight.contains_key(&number) {
            return Err(LendingError::conflict(format!(
                "a transition for item {number} is already in flight"
            )));
        }
        let snapshot = self
            .items
            .get(&number)
            .cloned()
            .ok_or(LendingError::NotFound(number))?;
        self.in_flight.insert(number, snapshot.clone());
        Ok(snapshot)
    }
}
