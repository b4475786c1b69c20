//! Event listener dispatch
//!
//! Listeners run on internal scheduling tasks and must return promptly.
//! Each invocation is spawned and bounded by a per-listener time budget so
//! one slow or failing listener can never stall the refresh loop or its
//! siblings.

use async_trait::async_trait;
use beacon_types::InstanceStatus;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::warn;

/// Marker events emitted when client-internal state changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeaconEvent {
    /// The local cache completed a bootstrap or delta cycle
    CacheRefreshed,
    /// The server-side view of this instance's status changed
    StatusChanged {
        previous: InstanceStatus,
        current: InstanceStatus,
    },
}

/// A callback registered with the client
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, event: BeaconEvent);
}

/// Fire-and-forget fan-out to registered listeners
pub struct EventDispatcher {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
    timeout: Duration,
}

impl EventDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            timeout,
        }
    }

    pub fn register(&self, listener: Arc<dyn EventListener>) {
        self.listeners
            .write()
            .expect("listener registry poisoned")
            .push(listener);
    }

    /// Remove a previously registered listener; returns whether it was found.
    pub fn unregister(&self, listener: &Arc<dyn EventListener>) -> bool {
        let mut listeners = self.listeners.write().expect("listener registry poisoned");
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .expect("listener registry poisoned")
            .len()
    }

    /// Dispatch to every listener, one spawned task each.
    ///
    /// Never waits for handlers; a listener exceeding its time budget is
    /// logged and abandoned.
    pub fn dispatch(&self, event: BeaconEvent) {
        let listeners: Vec<Arc<dyn EventListener>> = self
            .listeners
            .read()
            .expect("listener registry poisoned")
            .clone();

        for listener in listeners {
            let event = event.clone();
            let budget = self.timeout;
            tokio::spawn(async move {
                if tokio::time::timeout(budget, listener.on_event(event.clone()))
                    .await
                    .is_err()
                {
                    warn!(?event, "Event listener exceeded its time budget");
                }
            });
        }
    }
}
