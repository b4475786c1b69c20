//! Cached read views of the registry
//!
//! Readers (full and delta fetches) are served from a cached snapshot so
//! they never contend with the write path. The cache tracks the registry's
//! snapshot generation and recomputes only when something actually changed;
//! a background refresh keeps it warm between read bursts.

use crate::registry::LeaseRegistry;
use beacon_types::{Applications, DeltaEntry};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::debug;

/// Immutable full-registry view plus its checksum
#[derive(Debug, Clone)]
pub struct FullRegistryView {
    pub applications: Arc<Applications>,
    pub checksum: String,
}

/// Delta view: retained change entries plus the checksum of the current
/// full state (not of the delta), so clients can verify convergence.
#[derive(Debug, Clone)]
pub struct DeltaView {
    pub entries: Vec<DeltaEntry>,
    pub checksum: String,
}

struct CachedSnapshot {
    generation: u64,
    view: FullRegistryView,
}

/// Snapshot + checksum cache in front of a [`LeaseRegistry`].
pub struct ResponseCache {
    registry: Arc<LeaseRegistry>,
    cached: RwLock<CachedSnapshot>,
}

impl ResponseCache {
    pub fn new(registry: Arc<LeaseRegistry>) -> Self {
        let view = Self::compute(&registry);
        let cached = CachedSnapshot {
            generation: registry.generation(),
            view,
        };
        Self {
            registry,
            cached: RwLock::new(cached),
        }
    }

    /// Current full snapshot and checksum.
    pub async fn full(&self) -> FullRegistryView {
        {
            let cached = self.cached.read().await;
            if cached.generation == self.registry.generation() {
                return cached.view.clone();
            }
        }
        self.refresh().await
    }

    /// Retained change entries plus the current full-state checksum.
    pub async fn delta(&self) -> DeltaView {
        let entries = self.registry.delta_entries(Utc::now());
        let full = self.full().await;
        DeltaView {
            entries,
            checksum: full.checksum,
        }
    }

    /// Recompute the cached snapshot from the registry.
    pub async fn refresh(&self) -> FullRegistryView {
        // Snapshot composition happens outside the cache lock; writers are
        // never blocked on readers rebuilding the view.
        let generation = self.registry.generation();
        let view = Self::compute(&self.registry);

        let mut cached = self.cached.write().await;
        // A racing refresh may have stored a newer view already.
        if generation >= cached.generation {
            cached.generation = generation;
            cached.view = view.clone();
        }
        debug!(generation, instances = view.applications.len(), "Response cache refreshed");
        view
    }

    /// Periodic refresh keeping the cache warm; runs until shutdown flips.
    pub async fn run_refresh_loop(
        self: Arc<Self>,
        interval_secs: u64,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if self.cached.read().await.generation != self.registry.generation() {
                        self.refresh().await;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    fn compute(registry: &LeaseRegistry) -> FullRegistryView {
        let applications = registry.snapshot();
        let checksum = applications.checksum();
        FullRegistryView {
            applications: Arc::new(applications),
            checksum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use beacon_types::{InstanceId, InstanceRecord, InstanceStatus};

    fn record(app: &str, id: &str) -> InstanceRecord {
        InstanceRecord::new(app, InstanceId::new(id), "10.0.0.1", 8080)
            .with_status(InstanceStatus::Up)
    }

    #[tokio::test]
    async fn full_view_tracks_writes() {
        let registry = Arc::new(LeaseRegistry::new(RegistryConfig::default()).unwrap());
        let cache = ResponseCache::new(registry.clone());

        assert!(cache.full().await.applications.is_empty());

        registry.register(record("billing", "i-1"), None, false);
        let view = cache.full().await;
        assert_eq!(view.applications.len(), 1);
        assert_eq!(view.checksum, view.applications.checksum());
    }

    #[tokio::test]
    async fn delta_carries_full_state_checksum() {
        let registry = Arc::new(LeaseRegistry::new(RegistryConfig::default()).unwrap());
        let cache = ResponseCache::new(registry.clone());

        registry.register(record("billing", "i-1"), None, false);
        registry.register(record("auth", "i-2"), None, false);

        let delta = cache.delta().await;
        assert_eq!(delta.entries.len(), 2);
        assert_eq!(delta.checksum, registry.snapshot().checksum());
    }

    #[tokio::test]
    async fn unchanged_generation_serves_cached_view() {
        let registry = Arc::new(LeaseRegistry::new(RegistryConfig::default()).unwrap());
        let cache = ResponseCache::new(registry.clone());
        registry.register(record("billing", "i-1"), None, false);

        let a = cache.full().await;
        let b = cache.full().await;
        // Same Arc: the second read hit the cache.
        assert!(Arc::ptr_eq(&a.applications, &b.applications));
    }
}
