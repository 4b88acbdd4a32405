//! Optimistic update and rollback behavior of the client mirror.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use brolly::prelude::*;
use brolly_client::{attach, ProjectionCache};
use brolly_core::types::{ItemPatch, NewActivity};

/// Realtime store wrapper that can be switched into an outage where every
/// item write fails.
struct FlakyStore {
    inner: RealtimeStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn new(config: PoolConfig) -> Self {
        Self {
            inner: RealtimeStore::new(config),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(LendingError::backend("injected outage"))
        } else {
            Ok(())
        }
    }
}

impl ItemStore for FlakyStore {
    fn all_items(&self) -> Result<Vec<Item>> {
        self.inner.all_items()
    }

    fn item_by_number(&self, number: ItemNumber) -> Result<Option<Item>> {
        self.inner.item_by_number(number)
    }

    fn create_item(&self, number: ItemNumber) -> Result<Item> {
        self.check()?;
        self.inner.create_item(number)
    }

    fn upsert_item(&self, number: ItemNumber, patch: &ItemPatch) -> Result<Item> {
        self.check()?;
        self.inner.upsert_item(number, patch)
    }

    fn initialize_all(&self) -> Result<()> {
        self.inner.initialize_all()
    }

    fn clear_items(&self) -> Result<()> {
        self.inner.clear_items()
    }
}

impl ActivityLog for FlakyStore {
    fn append_activity(&self, entry: NewActivity) -> Result<Activity> {
        self.check()?;
        self.inner.append_activity(entry)
    }

    fn recent_activities(&self, limit: usize) -> Result<Vec<Activity>> {
        self.inner.recent_activities(limit)
    }

    fn clear_activities(&self) -> Result<()> {
        self.inner.clear_activities()
    }
}

fn flaky_engine() -> (Arc<FlakyStore>, LendingEngine<FlakyStore>) {
    let config = PoolConfig::default();
    let store = Arc::new(FlakyStore::new(config.clone()));
    let engine = LendingEngine::new(store.clone(), config);
    engine.initialize().unwrap();
    (store, engine)
}

fn nan_request() -> BorrowRequest {
    BorrowRequest {
        borrower: "Nan".into(),
        contact: "0812345678".into(),
        location: Location::Cafeteria,
    }
}

#[test]
fn backend_outage_rolls_the_mirror_back_exactly() {
    let (store, engine) = flaky_engine();
    let mut cache = ProjectionCache::new();
    cache.refresh(&engine).unwrap();

    let before = cache.item(5).unwrap().clone();
    assert!(before.is_available());

    store.set_failing(true);
    let err = cache.borrow(&engine, 5, nan_request()).unwrap_err();
    assert!(matches!(err, LendingError::BackendUnavailable(_)));

    // No ghost "borrowed" state: the displayed record is bit-for-bit the
    // pre-attempt one.
    assert_eq!(cache.item(5).unwrap(), &before);
    assert!(!cache.has_in_flight(5));
}

#[test]
fn rejected_return_rolls_back_the_optimistic_shape() {
    let (_store, engine) = flaky_engine();
    let mut cache = ProjectionCache::new();
    cache.refresh(&engine).unwrap();

    let before = cache.item(3).unwrap().clone();

    // Item 3 is available, so the engine refuses the return; the optimistic
    // returnLocation/returnedAt must vanish again.
    let err = cache.return_item(&engine, 3, Location::Gym).unwrap_err();
    assert!(matches!(err, LendingError::Conflict(_)));
    assert_eq!(cache.item(3).unwrap(), &before);
}

#[test]
fn optimistic_state_is_visible_before_confirmation() {
    let (_store, engine) = flaky_engine();
    let mut cache = ProjectionCache::new();
    cache.refresh(&engine).unwrap();

    cache.begin_borrow(2, &nan_request()).unwrap();

    let shown = cache.item(2).unwrap();
    assert!(shown.is_borrowed());
    assert_eq!(shown.borrower.as_deref(), Some("Nan"));
    assert!(cache.has_in_flight(2));

    // Authoritative store has not moved yet.
    assert!(engine.item(2).unwrap().is_available());
}

#[test]
fn second_transition_on_same_item_is_rejected_locally() {
    let (_store, engine) = flaky_engine();
    let mut cache = ProjectionCache::new();
    cache.refresh(&engine).unwrap();

    cache.begin_borrow(2, &nan_request()).unwrap();

    let err = cache.borrow(&engine, 2, nan_request()).unwrap_err();
    assert!(matches!(err, LendingError::Conflict(_)));
    let err = cache.begin_return(2, Location::Gym).unwrap_err();
    assert!(matches!(err, LendingError::Conflict(_)));

    // Nothing reached the engine: no activity was logged.
    assert!(engine.activities().unwrap().is_empty());

    // A different item is unaffected by the guard.
    cache.begin_borrow(3, &nan_request()).unwrap();
}

#[test]
fn successful_borrow_adopts_the_authoritative_record() {
    let (_store, engine) = flaky_engine();
    let mut cache = ProjectionCache::new();
    cache.refresh(&engine).unwrap();

    let item = cache.borrow(&engine, 2, nan_request()).unwrap();
    assert!(item.is_borrowed());
    assert_eq!(cache.item(2).unwrap(), &item);
    assert_eq!(cache.item(2).unwrap(), &engine.item(2).unwrap());
    assert!(!cache.has_in_flight(2));

    let stats = cache.stats();
    assert_eq!(stats.borrowed, 1);
    assert_eq!(stats.total, 21);
}

#[test]
fn authoritative_snapshots_win_over_local_state() {
    let (_store, engine) = flaky_engine();
    let mut cache = ProjectionCache::new();
    cache.refresh(&engine).unwrap();

    // Another client borrows item 7 behind our back.
    engine.borrow(7, nan_request()).unwrap();
    assert!(cache.item(7).unwrap().is_available());

    cache.refresh(&engine).unwrap();
    assert!(cache.item(7).unwrap().is_borrowed());
}

#[test]
fn attached_mirror_follows_pushed_snapshots() {
    let config = PoolConfig::default();
    let store = Arc::new(RealtimeStore::new(config.clone()));
    let engine = LendingEngine::new(store.clone(), config);
    engine.initialize().unwrap();

    let cache = Arc::new(Mutex::new(ProjectionCache::new()));
    attach(cache.clone(), store.hub());

    // A write by some other caller fans out to the mirror without a refresh.
    engine.borrow(4, nan_request()).unwrap();

    let cache = cache.lock();
    assert!(cache.item(4).unwrap().is_borrowed());
    assert_eq!(cache.activities().len(), 1);
    assert_eq!(cache.activities()[0].item_number, 4);
}
