//! Push-based in-process store.
//!
//! State lives in memory behind rwlocks; every successful write publishes a
//! full snapshot of the changed resource through the [`ChangeHub`], which is
//! how connected observers re-synchronize. Activity entries get opaque
//! push-style ids (millisecond timestamp plus a process-wide counter) that
//! sort lexicographically in insertion order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use brolly_core::{
    error::{LendingError, Result},
    traits::{ActivityLog, ItemStore},
    types::{Activity, Item, ItemNumber, ItemPatch, NewActivity},
    PoolConfig,
};

use crate::hub::{ChangeHub, Snapshot, Topic};

/// The real-time adapter: an in-memory item tree and activity list with
/// snapshot fan-out on every write.
pub struct RealtimeStore {
    config: PoolConfig,
    hub: Arc<ChangeHub>,
    items: RwLock<BTreeMap<ItemNumber, Item>>,
    /// Oldest first; pruned to `config.activity_window` on append.
    activities: RwLock<Vec<Activity>>,
    seq: AtomicU64,
}

impl RealtimeStore {
    pub fn new(config: PoolConfig) -> Self {
        Self::with_hub(config, Arc::new(ChangeHub::new()))
    }

    /// Share an externally-owned hub, e.g. when several observers are wired
    /// up before the store exists.
    pub fn with_hub(config: PoolConfig, hub: Arc<ChangeHub>) -> Self {
        Self {
            config,
            hub,
            items: RwLock::new(BTreeMap::new()),
            activities: RwLock::new(Vec::new()),
            seq: AtomicU64::new(0),
        }
    }

    pub fn hub(&self) -> &Arc<ChangeHub> {
        &self.hub
    }

    /// Opaque, lexicographically sortable activity id.
    fn push_id(&self) -> String {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("{millis:012x}-{seq:06x}")
    }

    fn publish_items(&self) {
        let snapshot = Snapshot::Items(self.items.read().values().cloned().collect());
        self.hub.publish(Topic::Items, snapshot);
    }

    fn publish_activities(&self) {
        let snapshot = Snapshot::Activities(
            self.activities.read().iter().rev().cloned().collect(),
        );
        self.hub.publish(Topic::Activities, snapshot);
    }
}

impl ItemStore for RealtimeStore {
    fn all_items(&self) -> Result<Vec<Item>> {
        if self.items.read().is_empty() {
            tracing::info!(pool_size = self.config.pool_size, "empty store, bootstrapping pool");
            self.initialize_all()?;
        }
        Ok(self.items.read().values().cloned().collect())
    }

    fn item_by_number(&self, number: ItemNumber) -> Result<Option<Item>> {
        Ok(self.items.read().get(&number).cloned())
    }

    fn create_item(&self, number: ItemNumber) -> Result<Item> {
        let item = {
            let mut items = self.items.write();
            if items.contains_key(&number) {
                return Err(LendingError::conflict(format!(
                    "item {number} already exists"
                )));
            }
            let item = Item::available(number, Utc::now());
            items.insert(number, item.clone());
            item
        };
        self.publish_items();
        Ok(item)
    }

    fn upsert_item(&self, number: ItemNumber, patch: &ItemPatch) -> Result<Item> {
        let merged = {
            let mut items = self.items.write();
            let current = items
                .get_mut(&number)
                .ok_or(LendingError::NotFound(number))?;
            patch.apply(current);
            current.updated_at = Utc::now();
            current.clone()
        };
        self.publish_items();
        Ok(merged)
    }

    fn initialize_all(&self) -> Result<()> {
        let now = Utc::now();
        {
            let mut items = self.items.write();
            *items = (1..=self.config.pool_size)
                .map(|n| (n, Item::available(n, now)))
                .collect();
        }
        tracing::debug!(pool_size = self.config.pool_size, "pool initialized");
        self.publish_items();
        Ok(())
    }

    fn clear_items(&self) -> Result<()> {
        self.items.write().clear();
        self.publish_items();
        Ok(())
    }
}

impl ActivityLog for RealtimeStore {
    fn append_activity(&self, entry: NewActivity) -> Result<Activity> {
        let activity = Activity {
            id: self.push_id(),
            kind: entry.kind,
            item_number: entry.item_number,
            actor_name: entry.actor_name,
            location: entry.location,
            timestamp: Utc::now(),
        };
        {
            let mut activities = self.activities.write();
            activities.push(activity.clone());
            let len = activities.len();
            if len > self.config.activity_window {
                activities.drain(..len - self.config.activity_window);
            }
        }
        self.publish_activities();
        Ok(activity)
    }

    fn recent_activities(&self, limit: usize) -> Result<Vec<Activity>> {
        Ok(self
            .activities
            .read()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    fn clear_activities(&self) -> Result<()> {
        self.activities.write().clear();
        self.publish_activities();
        Ok(())
    }
}
