//! Client-side registry cache
//!
//! A local read replica of the server registry. Bootstraps with one full
//! fetch, then applies delta fetches in order and verifies the result
//! against the server-reported checksum. Any divergence forces a full
//! re-bootstrap; delta queues are retention-bounded, so a slow client is
//! expected to hit this path occasionally.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::events::{BeaconEvent, EventDispatcher};
use beacon_transport::RegistryTransport;
use beacon_types::{Applications, InstanceRecord};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Sync lifecycle of the local cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No fetch has completed yet
    Uninitialized,
    /// Full fetch in progress
    Bootstrapping,
    /// Local cache verified against the server checksum
    Synced,
    /// Delta divergence detected, full re-sync pending
    Resyncing,
}

struct Committed {
    apps: Arc<Applications>,
    checksum: Option<String>,
    fetched_at: Option<DateTime<Utc>>,
}

/// Local read replica of the registry.
pub struct ClientRegistryCache {
    transport: Arc<dyn RegistryTransport>,
    config: ClientConfig,
    committed: RwLock<Committed>,
    state: RwLock<CacheState>,
    dispatcher: Arc<EventDispatcher>,
}

impl ClientRegistryCache {
    pub fn new(
        transport: Arc<dyn RegistryTransport>,
        config: ClientConfig,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            transport,
            config,
            committed: RwLock::new(Committed {
                apps: Arc::new(Applications::new()),
                checksum: None,
                fetched_at: None,
            }),
            state: RwLock::new(CacheState::Uninitialized),
            dispatcher,
        }
    }

    pub fn state(&self) -> CacheState {
        *self.state.read().expect("cache state poisoned")
    }

    /// Checksum committed by the last successful sync.
    pub fn last_checksum(&self) -> Option<String> {
        self.committed
            .read()
            .expect("cache poisoned")
            .checksum
            .clone()
    }

    /// Whether the last successful sync is within the freshness window.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let committed = self.committed.read().expect("cache poisoned");
        match committed.fetched_at {
            Some(at) => now - at <= Duration::seconds(self.config.freshness_window_secs() as i64),
            None => false,
        }
    }

    /// The committed snapshot. Never touches the network.
    pub fn applications(&self) -> Arc<Applications> {
        self.committed.read().expect("cache poisoned").apps.clone()
    }

    /// Instances of one application; empty for unknown applications.
    pub fn instances_of(&self, app_name: &str) -> Vec<InstanceRecord> {
        self.applications().get(app_name).to_vec()
    }

    /// Instances matching a vip address.
    pub fn instances_by_vip(&self, vip: &str) -> Vec<InstanceRecord> {
        self.applications()
            .instances_by_vip(vip)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Predicate-filtered lookup covering the region/status/zone variants.
    pub fn instances_where<F>(&self, mut predicate: F) -> Vec<InstanceRecord>
    where
        F: FnMut(&InstanceRecord) -> bool,
    {
        self.applications()
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    /// Replace the local cache wholesale from a full fetch.
    pub async fn bootstrap(&self) -> Result<()> {
        self.set_state(CacheState::Bootstrapping);

        let full = self.transport.fetch_full().await.map_err(|e| {
            self.set_state(CacheState::Uninitialized);
            e
        })?;

        let instances = full.applications.len();
        self.commit(full.applications, full.checksum);
        self.set_state(CacheState::Synced);
        info!(instances, "Registry cache bootstrapped");

        self.dispatcher.dispatch(BeaconEvent::CacheRefreshed);
        Ok(())
    }

    /// One refresh cycle: delta fetch, verify, commit; full re-sync when the
    /// checksums diverge or nothing was fetched yet.
    pub async fn refresh(&self) -> Result<()> {
        if matches!(self.state(), CacheState::Uninitialized | CacheState::Resyncing) {
            return self.bootstrap().await;
        }

        let delta = self.transport.fetch_delta().await?;

        let mut patched = (*self.applications()).clone();
        for entry in &delta.entries {
            patched.apply(entry);
        }

        let local = patched.checksum();
        if local != delta.checksum {
            // The partially applied copy is discarded; bootstrap replaces
            // everything.
            warn!(
                local = %local,
                server = %delta.checksum,
                applied = delta.entries.len(),
                "Delta checksum mismatch, forcing full re-sync"
            );
            self.set_state(CacheState::Resyncing);
            self.bootstrap().await?;
            return Err(ClientError::ChecksumMismatch {
                local,
                server: delta.checksum,
            });
        }

        debug!(applied = delta.entries.len(), "Delta cycle committed");
        self.commit(patched, local);
        self.set_state(CacheState::Synced);
        self.dispatcher.dispatch(BeaconEvent::CacheRefreshed);
        Ok(())
    }

    /// Periodic refresh loop; transport failures are logged and retried on
    /// the next tick.
    pub async fn run_refresh_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(
            self.config.fetch_interval_secs,
        ));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.refresh().await {
                        Ok(()) => {}
                        Err(ClientError::ChecksumMismatch { .. }) => {
                            // Already re-bootstrapped inside refresh().
                        }
                        Err(e) => warn!(error = %e, "Cache refresh failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("Cache refresh loop stopping");
                        break;
                    }
                }
            }
        }
    }

    fn commit(&self, apps: Applications, checksum: String) {
        let mut committed = self.committed.write().expect("cache poisoned");
        committed.apps = Arc::new(apps);
        committed.checksum = Some(checksum);
        committed.fetched_at = Some(Utc::now());
    }

    fn set_state(&self, state: CacheState) {
        *self.state.write().expect("cache state poisoned") = state;
    }
}
