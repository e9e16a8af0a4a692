//! Typed publish/subscribe for change batches.
//!
//! Dispatch is synchronous: `publish` returns only after every matching
//! callback ran. Callbacks for one publish run in registration order, concrete
//! category subscribers before catch-all ones.
//!
//! # Panic Safety
//!
//! Each callback runs inside [`std::panic::catch_unwind`]. A panicking
//! subscriber is logged and skipped; the remaining subscribers still run and
//! the panic never reaches the publisher.
//!
//! # Reentrancy
//!
//! The subscriber list is snapshotted before dispatch, so a callback may
//! subscribe or unsubscribe (itself included) without deadlocking. Such
//! changes apply from the next publish onward.

use super::category::Channel;
use super::types::{ChangeBatch, ConnectionStatus};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Handle returned by `subscribe`, used to unsubscribe.
///
/// Monotonically assigned by [`NotificationBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Callback invoked with each published batch.
pub type BatchCallback = Arc<dyn Fn(&ChangeBatch) + Send + Sync>;

/// Callback invoked with each connectivity change.
pub type ConnectivityCallback = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

#[derive(Clone)]
enum Listener {
    Batch(Channel, BatchCallback),
    Connectivity(ConnectivityCallback),
}

/// Subscriptions keyed by [`Channel`], plus connectivity listeners.
#[derive(Default)]
pub struct NotificationBus {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Listener)>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for one category, or for every category with [`Channel::All`].
    pub fn subscribe<F>(&self, channel: impl Into<Channel>, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeBatch) + Send + Sync + 'static,
    {
        let channel = channel.into();
        let id = self.register(Listener::Batch(channel, Arc::new(callback)));
        tracing::debug!(subscription_id = %id, channel = %channel, "Subscribed");
        id
    }

    /// Register `callback` for connected/disconnected signals.
    pub fn subscribe_connectivity<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        let id = self.register(Listener::Connectivity(Arc::new(callback)));
        tracing::debug!(subscription_id = %id, "Subscribed to connectivity");
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        let removed = subscribers.len() != before;
        if removed {
            tracing::debug!(subscription_id = %id, "Unsubscribed");
        }
        removed
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of batch subscribers registered on exactly `channel`.
    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.lock()
            .iter()
            .filter(|(_, l)| matches!(l, Listener::Batch(c, _) if *c == channel))
            .count()
    }

    /// Deliver `batch` to its category's subscribers, then to catch-all subscribers.
    ///
    /// Returns the number of callbacks that completed without panicking.
    pub fn publish(&self, batch: &ChangeBatch) -> usize {
        let own = Channel::Category(batch.category);
        let snapshot = self.snapshot();
        let targets = snapshot
            .iter()
            .filter_map(|(id, l)| match l {
                Listener::Batch(c, cb) if *c == own => Some((*id, cb)),
                _ => None,
            })
            .chain(snapshot.iter().filter_map(|(id, l)| match l {
                Listener::Batch(Channel::All, cb) => Some((*id, cb)),
                _ => None,
            }));

        let mut delivered = 0;
        for (id, callback) in targets {
            if invoke(id, || callback(batch)) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Deliver a connectivity signal to every connectivity subscriber.
    pub fn publish_connectivity(&self, status: ConnectionStatus) -> usize {
        let snapshot = self.snapshot();
        let mut delivered = 0;
        for (id, listener) in &snapshot {
            if let Listener::Connectivity(callback) = listener {
                if invoke(*id, || callback(status)) {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    fn register(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.lock().push((id, listener));
        id
    }

    fn snapshot(&self) -> Vec<(SubscriptionId, Listener)> {
        self.lock().clone()
    }

    // Callbacks never run under this lock.
    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Listener)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn invoke(id: SubscriptionId, f: impl FnOnce()) -> bool {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(panic) => {
            let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "callback panicked".to_string()
            };
            metrics::counter!("agentwatch_subscriber_panics_total").increment(1);
            tracing::error!(subscription_id = %id, panic = %msg, "Subscriber callback panicked");
            false
        }
    }
}
