//! Client-side mirror for the brolly lending system
//!
//! Keeps a local, disposable copy of the item collection so callers can
//! render state and apply transitions without waiting on the backend:
//! optimistic updates are shown immediately and rolled back verbatim if the
//! authoritative operation fails. With the real-time backend the mirror can
//! be wired straight into the store's change hub, so every confirmed write
//! re-synchronizes it automatically.

pub mod cache;

use std::sync::Arc;

use parking_lot::Mutex;

use brolly_realtime::{ChangeHub, Snapshot, SubscriptionId, Topic};

pub use cache::{ProjectionCache, ACTIVITY_DISPLAY_WINDOW};

/// Subscribe a shared mirror to a real-time store's change hub.
///
/// Every confirmed write pushes a full snapshot into the mirror. Deliveries
/// arriving while the mirror is locked (e.g. mid-transition on the same
/// thread) are skipped rather than blocked on; snapshots are full-state, so
/// the next delivery or refresh converges.
pub fn attach(
    cache: Arc<Mutex<ProjectionCache>>,
    hub: &ChangeHub,
) -> (SubscriptionId, SubscriptionId) {
    let items_cache = cache.clone();
    let items = hub.subscribe(Topic::Items, move |snapshot| {
        if let Snapshot::Items(items) = snapshot {
            match items_cache.try_lock() {
                Some(mut cache) => cache.apply_items(items.clone()),
                None => tracing::debug!("mirror busy, skipping item snapshot"),
            }
        }
    });

    let activities = hub.subscribe(Topic::Activities, move |snapshot| {
        if let Snapshot::Activities(entries) = snapshot {
            match cache.try_lock() {
                Some(mut cache) => cache.apply_activities(entries.clone()),
                None => tracing::debug!("mirror busy, skipping activity snapshot"),
            }
        }
    });

    (items, activities)
}
