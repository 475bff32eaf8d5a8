//! Progress notifications from fulfillment strategies.
//!
//! Each strategy owns a [`ProgressEvents`] hub. Observers subscribe before the
//! transfer is triggered and receive events synchronously on whatever thread
//! the strategy emits from. Dropping (or explicitly unsubscribing) the
//! returned [`Subscription`] detaches the observer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::{Deserialize, Serialize};

/// A transfer progress notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum FulfillmentProgress {
    /// The request for `uri` is about to be sent
    Started { uri: String },

    /// `received` bytes have arrived so far, out of `expected` if known
    Received { received: u64, expected: Option<u64> },

    /// The transfer completed with `received` bytes
    Finished { received: u64 },
}

type Observer = Arc<dyn Fn(&FulfillmentProgress) + Send + Sync>;
type Observers = Mutex<Vec<(u64, Observer)>>;

/// Subscriber list for a strategy's progress events
#[derive(Default)]
pub struct ProgressEvents {
    observers: Arc<Observers>,
    next_id: AtomicU64,
}

impl ProgressEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer; it stays attached until the subscription is
    /// dropped or unsubscribed
    #[must_use = "dropping the subscription detaches the observer immediately"]
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&FulfillmentProgress) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.observers).push((id, Arc::new(observer)));

        Subscription {
            id,
            observers: Arc::downgrade(&self.observers),
        }
    }

    /// Deliver an event to every current observer, in subscription order
    pub fn emit(&self, event: FulfillmentProgress) {
        // Observers run outside the lock so they may subscribe or unsubscribe.
        let observers: Vec<Observer> = lock(&self.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.observers).len()
    }
}

/// Handle returned by [`ProgressEvents::subscribe`]
pub struct Subscription {
    id: u64,
    observers: Weak<Observers>,
}

impl Subscription {
    /// Detach the observer
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            lock(&observers).retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock(observers: &Observers) -> MutexGuard<'_, Vec<(u64, Observer)>> {
    observers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
