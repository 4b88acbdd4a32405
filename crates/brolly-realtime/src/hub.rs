//! Publish/subscribe registry for pushing state changes to observers.
//!
//! Subscribers register per resource and receive full-state snapshots, not
//! diffs; a late or lossy observer always converges on the next delivery.
//! Async consumers can instead await [`ChangeHub::changed`] and pull the
//! state they care about.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Notify;

use brolly_core::types::{Activity, Item};

/// Logical resource a subscriber can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Items,
    Activities,
}

/// Full-state snapshot delivered on every publish.
#[derive(Debug, Clone)]
pub enum Snapshot {
    /// Every item, ordered by item number ascending.
    Items(Vec<Item>),
    /// The retained activity window, most recent first.
    Activities(Vec<Activity>),
}

/// Handle returned by [`ChangeHub::subscribe`]; pass it back to
/// [`ChangeHub::unsubscribe`] to stop deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId {
    topic: Topic,
    id: u64,
}

type SnapshotFn = Box<dyn Fn(&Snapshot) + Send + Sync>;

/// In-process fan-out of store changes.
///
/// Callbacks run synchronously on the thread that performed the write, so
/// they should stay short; delivery order across subscribers is not
/// specified. Registering or removing a subscriber from inside a callback
/// deadlocks.
pub struct ChangeHub {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<Topic, Vec<(u64, SnapshotFn)>>>,
    notifies: RwLock<HashMap<Topic, Arc<Notify>>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            subscribers: RwLock::new(HashMap::new()),
            notifies: RwLock::new(HashMap::new()),
        }
    }

    /// Register a callback for every future publish on `topic`.
    pub fn subscribe(
        &self,
        topic: Topic,
        callback: impl Fn(&Snapshot) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .entry(topic)
            .or_default()
            .push((id, Box::new(callback)));
        SubscriptionId { topic, id }
    }

    pub fn unsubscribe(&self, subscription: SubscriptionId) {
        if let Some(list) = self.subscribers.write().get_mut(&subscription.topic) {
            list.retain(|(id, _)| *id != subscription.id);
        }
    }

    /// Deliver `snapshot` to every subscriber of `topic` and wake async
    /// waiters.
    pub fn publish(&self, topic: Topic, snapshot: Snapshot) {
        {
            let subscribers = self.subscribers.read();
            if let Some(list) = subscribers.get(&topic) {
                tracing::debug!(?topic, subscribers = list.len(), "fan-out");
                for (_, callback) in list {
                    callback(&snapshot);
                }
            }
        }
        if let Some(notify) = self.notifies.read().get(&topic) {
            notify.notify_waiters();
        }
    }

    /// Wait until the next publish on `topic`.
    pub async fn changed(&self, topic: Topic) {
        let notify = {
            let mut map = self.notifies.write();
            map.entry(topic).or_insert_with(|| Arc::new(Notify::new())).clone()
        };
        notify.notified().await;
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers
            .read()
            .get(&topic)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}
