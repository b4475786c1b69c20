//! The replication pump
//!
//! Consumes the registry's mutation broadcast and fans each mutation out to
//! the peer node set, refreshing peer membership on its own interval.

use crate::config::ReplicationConfig;
use crate::node_set::PeerNodeSet;
use beacon_registry::RegistryMutation;
use beacon_transport::ReplicationInstruction;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

fn to_instruction(mutation: RegistryMutation) -> ReplicationInstruction {
    match mutation {
        RegistryMutation::Register {
            record,
            lease_duration_secs,
        } => ReplicationInstruction::Register {
            record,
            lease_duration_secs: Some(lease_duration_secs),
        },
        RegistryMutation::Renew {
            app_name,
            instance_id,
        } => ReplicationInstruction::Renew {
            app_name,
            instance_id,
        },
        RegistryMutation::Cancel {
            app_name,
            instance_id,
        } => ReplicationInstruction::Cancel {
            app_name,
            instance_id,
        },
        RegistryMutation::StatusUpdate { record } => {
            ReplicationInstruction::StatusUpdate { record }
        }
    }
}

/// Propagates local registry mutations to all known peers.
pub struct PeerReplicator {
    nodes: Arc<PeerNodeSet>,
    config: ReplicationConfig,
}

impl PeerReplicator {
    pub fn new(nodes: Arc<PeerNodeSet>, config: ReplicationConfig) -> Self {
        Self { nodes, config }
    }

    pub fn nodes(&self) -> &Arc<PeerNodeSet> {
        &self.nodes
    }

    /// Pump mutations into peer queues until shutdown.
    ///
    /// Peer membership is refreshed on its own interval; a lagged mutation
    /// stream is logged and skipped (peers converge via their own sweeps
    /// and client re-registration).
    pub async fn run(
        &self,
        mut mutations: broadcast::Receiver<RegistryMutation>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if let Err(e) = self.nodes.refresh().await {
            warn!(error = %e, "Initial peer resolution failed");
        }

        let mut refresh_interval = tokio::time::interval(std::time::Duration::from_secs(
            self.config.peer_refresh_interval_secs,
        ));
        refresh_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = mutations.recv() => {
                    match result {
                        Ok(mutation) => {
                            self.nodes.broadcast(to_instruction(mutation));
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(lagged = n, "Replicator lagged behind mutation stream");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Mutation stream closed");
                            break;
                        }
                    }
                }
                _ = refresh_interval.tick() => {
                    if let Err(e) = self.nodes.refresh().await {
                        warn!(error = %e, "Peer refresh failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("Replicator stopping");
                        break;
                    }
                }
            }
        }

        // Queued work drains in the workers; new work is no longer accepted.
        self.nodes.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_set::{PeerResolver, PeerTransportFactory, StaticPeerResolver};
    use crate::Result;
    use async_trait::async_trait;
    use beacon_registry::{LeaseRegistry, RegistryConfig};
    use beacon_transport::{InMemoryTransport, RegistryTransport};
    use beacon_types::{InstanceId, InstanceRecord, InstanceStatus};
    use std::time::Duration;

    /// Hands out transports into pre-built peer registries, keyed by URL.
    struct FixedFactory {
        peers: dashmap::DashMap<String, Arc<LeaseRegistry>>,
    }

    impl PeerTransportFactory for FixedFactory {
        fn create(&self, base_url: &str) -> Arc<dyn RegistryTransport> {
            let registry = self
                .peers
                .get(base_url)
                .expect("unknown peer in test factory")
                .clone();
            Arc::new(InMemoryTransport::new(registry))
        }
    }

    fn record(app: &str, id: &str) -> InstanceRecord {
        InstanceRecord::new(app, InstanceId::new(id), "10.0.0.1", 8080)
            .with_status(InstanceStatus::Up)
    }

    #[tokio::test]
    async fn local_writes_reach_all_peers() {
        let origin = Arc::new(LeaseRegistry::new(RegistryConfig::default()).unwrap());
        let peer_a = Arc::new(LeaseRegistry::new(RegistryConfig::default()).unwrap());
        let peer_b = Arc::new(LeaseRegistry::new(RegistryConfig::default()).unwrap());

        let factory = FixedFactory {
            peers: dashmap::DashMap::new(),
        };
        factory.peers.insert("http://a".into(), peer_a.clone());
        factory.peers.insert("http://b".into(), peer_b.clone());

        let nodes = Arc::new(PeerNodeSet::new(
            Arc::new(StaticPeerResolver::new(vec![
                "http://a".into(),
                "http://b".into(),
            ])),
            Arc::new(factory),
            ReplicationConfig::default(),
            None,
        ));

        let replicator = PeerReplicator::new(nodes, ReplicationConfig::default());
        let mutations = origin.subscribe_mutations();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let pump = tokio::spawn(async move { replicator.run(mutations, shutdown_rx).await });

        // Give the pump a moment to resolve peers before writing.
        tokio::time::sleep(Duration::from_millis(50)).await;
        origin.register(record("billing", "i-1"), None, false);

        // Replication is asynchronous; poll for convergence.
        for _ in 0..100 {
            if peer_a.registered_count() == 1 && peer_b.registered_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(peer_a.registered_count(), 1);
        assert_eq!(peer_b.registered_count(), 1);

        // Replicated writes must not echo back out of the peers.
        let mut peer_mutations = peer_a.subscribe_mutations();
        assert!(peer_mutations.try_recv().is_err());

        shutdown_tx.send(true).unwrap();
        pump.await.unwrap();
    }

    #[tokio::test]
    async fn resolver_failure_does_not_kill_the_pump() {
        struct FailingResolver;

        #[async_trait]
        impl PeerResolver for FailingResolver {
            async fn resolve(&self) -> Result<Vec<String>> {
                Err(crate::ReplicationError::Resolver("dns down".into()))
            }
        }

        let origin = Arc::new(LeaseRegistry::new(RegistryConfig::default()).unwrap());
        let nodes = Arc::new(PeerNodeSet::new(
            Arc::new(FailingResolver),
            Arc::new(FixedFactory {
                peers: dashmap::DashMap::new(),
            }),
            ReplicationConfig::default(),
            None,
        ));
        let replicator = PeerReplicator::new(nodes, ReplicationConfig::default());

        let mutations = origin.subscribe_mutations();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let pump = tokio::spawn(async move { replicator.run(mutations, shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        origin.register(record("billing", "i-1"), None, false);
        tokio::time::sleep(Duration::from_millis(20)).await;

        shutdown_tx.send(true).unwrap();
        // The pump is still alive to observe the shutdown signal.
        tokio::time::timeout(Duration::from_secs(1), pump)
            .await
            .expect("pump should stop on shutdown")
            .unwrap();
    }
}
