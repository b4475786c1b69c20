//! Client facade
//!
//! Owns the registry cache and the heartbeat scheduler and runs both on
//! background tasks. `start` is non-blocking; `shutdown` stops the loops,
//! waits for them with a bounded grace period, and deregisters this
//! instance best-effort.

use crate::cache::{CacheState, ClientRegistryCache};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::events::{EventDispatcher, EventListener};
use crate::health::{HealthCheckHandler, StaticHealthCheck};
use crate::heartbeat::HeartbeatScheduler;
use beacon_transport::RegistryTransport;
use beacon_types::{Applications, InstanceRecord, InstanceStatus};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Discovery client: local registry replica plus self-registration.
pub struct BeaconClient {
    config: ClientConfig,
    cache: Arc<ClientRegistryCache>,
    heartbeat: Arc<HeartbeatScheduler>,
    dispatcher: Arc<EventDispatcher>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl BeaconClient {
    /// Build a client for one instance. Fails fast on an invalid config.
    pub fn new(
        transport: Arc<dyn RegistryTransport>,
        config: ClientConfig,
        record: InstanceRecord,
        health: Option<Arc<dyn HealthCheckHandler>>,
    ) -> Result<Self> {
        config.validate()?;

        let dispatcher = Arc::new(EventDispatcher::new(Duration::from_millis(
            config.listener_timeout_ms,
        )));
        let health =
            health.unwrap_or_else(|| Arc::new(StaticHealthCheck(InstanceStatus::Up)) as _);
        let cache = Arc::new(ClientRegistryCache::new(
            transport.clone(),
            config.clone(),
            dispatcher.clone(),
        ));
        let heartbeat = Arc::new(HeartbeatScheduler::new(
            transport,
            config.clone(),
            record,
            health,
            dispatcher.clone(),
        ));
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            cache,
            heartbeat,
            dispatcher,
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Bootstrap the cache, then spawn the refresh and heartbeat loops.
    pub async fn start(&self) -> Result<()> {
        self.cache.bootstrap().await?;

        let mut tasks = self.tasks.lock().await;
        tasks.push(tokio::spawn(
            self.cache.clone().run_refresh_loop(self.shutdown_tx.subscribe()),
        ));
        tasks.push(tokio::spawn(
            self.heartbeat.clone().run(self.shutdown_tx.subscribe()),
        ));
        info!(
            instance_id = %self.heartbeat.record().instance_id,
            "Discovery client started"
        );
        Ok(())
    }

    /// Stop background loops and deregister this instance.
    ///
    /// Loops that ignore the signal are abandoned after a grace period;
    /// deregistration failures are logged, not returned, since the server
    /// evicts the lease on its own anyway.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);

        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            if tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .is_err()
            {
                warn!("Background task did not stop within the grace period");
            }
        }

        if let Err(e) = self.heartbeat.deregister_self().await {
            warn!(error = %e, "Deregistration on shutdown failed");
        }
        info!("Discovery client stopped");
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The record this client registers for itself.
    pub fn self_record(&self) -> InstanceRecord {
        self.heartbeat.record()
    }

    /// Status the server last acknowledged for this instance.
    pub fn remote_status(&self) -> InstanceStatus {
        self.heartbeat.remote_status()
    }

    /// Whether consecutive heartbeat failures crossed the degraded threshold.
    pub fn is_degraded(&self) -> bool {
        self.heartbeat.is_degraded()
    }

    pub fn cache_state(&self) -> CacheState {
        self.cache.state()
    }

    /// Whether the cache synced within the freshness window.
    pub fn is_cache_fresh(&self) -> bool {
        self.cache.is_fresh(Utc::now())
    }

    /// Force one cache refresh cycle outside the periodic schedule.
    pub async fn refresh_now(&self) -> Result<()> {
        self.cache.refresh().await
    }

    pub fn register_event_listener(&self, listener: Arc<dyn EventListener>) {
        self.dispatcher.register(listener);
    }

    pub fn unregister_event_listener(&self, listener: &Arc<dyn EventListener>) -> bool {
        self.dispatcher.unregister(listener)
    }

    // Lookups, all served from the committed local snapshot.

    pub fn applications(&self) -> Arc<Applications> {
        self.cache.applications()
    }

    pub fn instances_of(&self, app_name: &str) -> Vec<InstanceRecord> {
        self.cache.instances_of(app_name)
    }

    pub fn instances_by_vip(&self, vip: &str) -> Vec<InstanceRecord> {
        self.cache.instances_by_vip(vip)
    }

    pub fn instances_where<F>(&self, predicate: F) -> Vec<InstanceRecord>
    where
        F: FnMut(&InstanceRecord) -> bool,
    {
        self.cache.instances_where(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_registry::{LeaseRegistry, RegistryConfig};
    use beacon_transport::InMemoryTransport;
    use beacon_types::InstanceId;

    fn server() -> (Arc<LeaseRegistry>, Arc<dyn RegistryTransport>) {
        let registry = Arc::new(LeaseRegistry::new(RegistryConfig::default()).unwrap());
        let transport: Arc<dyn RegistryTransport> =
            Arc::new(InMemoryTransport::new(registry.clone()));
        (registry, transport)
    }

    fn self_record() -> InstanceRecord {
        InstanceRecord::new("billing", InstanceId::new("i-self"), "10.0.0.1", 8080)
            .with_status(InstanceStatus::Up)
    }

    #[tokio::test]
    async fn start_bootstraps_and_registers() {
        let (registry, transport) = server();
        registry.register(
            InstanceRecord::new("payments", InstanceId::new("i-1"), "10.0.0.2", 8080)
                .with_status(InstanceStatus::Up),
            None,
            false,
        );

        let client =
            BeaconClient::new(transport, ClientConfig::default(), self_record(), None).unwrap();
        client.start().await.unwrap();

        // The heartbeat loop registers on its first iteration.
        for _ in 0..50 {
            if !client.instances_of("billing").is_empty() || registry.registered_count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(registry.registered_count(), 2);
        assert_eq!(client.instances_of("payments").len(), 1);
        assert_eq!(client.cache_state(), CacheState::Synced);
        assert!(client.is_cache_fresh());

        client.shutdown().await;
        assert_eq!(
            registry
                .snapshot()
                .get("billing")
                .len(),
            0
        );
    }

    #[tokio::test]
    async fn refresh_now_picks_up_new_instances() {
        let (registry, transport) = server();
        let client =
            BeaconClient::new(transport, ClientConfig::default(), self_record(), None).unwrap();
        client.start().await.unwrap();

        registry.register(
            InstanceRecord::new("payments", InstanceId::new("i-1"), "10.0.0.2", 8080)
                .with_status(InstanceStatus::Up),
            None,
            false,
        );
        assert!(client.instances_of("payments").is_empty());

        client.refresh_now().await.unwrap();
        assert_eq!(client.instances_of("payments").len(), 1);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_config_rejected_at_construction() {
        let (_registry, transport) = server();
        let config = ClientConfig {
            fetch_interval_secs: 0,
            ..Default::default()
        };
        assert!(BeaconClient::new(transport, config, self_record(), None).is_err());
    }
}
