//! Peer membership and per-peer queue handles

use crate::config::ReplicationConfig;
use crate::error::Result;
use crate::worker::run_peer_worker;
use async_trait::async_trait;
use beacon_transport::{RegistryTransport, ReplicationInstruction};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Produces the current list of peer base URLs.
///
/// The static implementation reads a configured list; DNS or zone-based
/// resolution plugs in behind the same trait.
#[async_trait]
pub trait PeerResolver: Send + Sync {
    async fn resolve(&self) -> Result<Vec<String>>;
}

/// Fixed peer list from configuration
pub struct StaticPeerResolver {
    peers: Vec<String>,
}

impl StaticPeerResolver {
    pub fn new(peers: Vec<String>) -> Self {
        Self { peers }
    }
}

#[async_trait]
impl PeerResolver for StaticPeerResolver {
    async fn resolve(&self) -> Result<Vec<String>> {
        Ok(self.peers.clone())
    }
}

/// Builds a transport for a peer base URL.
///
/// Production supplies an HTTP factory; tests wire peers up in process.
pub trait PeerTransportFactory: Send + Sync {
    fn create(&self, base_url: &str) -> Arc<dyn RegistryTransport>;
}

struct PeerHandle {
    tx: mpsc::Sender<ReplicationInstruction>,
    worker: JoinHandle<()>,
}

/// The live set of replication targets.
///
/// Each peer owns a bounded queue and a worker task. Membership changes
/// take effect without touching in-flight work: a removed peer's sender is
/// dropped, its worker drains what is queued and exits.
pub struct PeerNodeSet {
    resolver: Arc<dyn PeerResolver>,
    factory: Arc<dyn PeerTransportFactory>,
    config: ReplicationConfig,
    /// This node's own URL, excluded from the resolved peer list.
    self_url: Option<String>,
    peers: DashMap<String, PeerHandle>,
}

impl PeerNodeSet {
    pub fn new(
        resolver: Arc<dyn PeerResolver>,
        factory: Arc<dyn PeerTransportFactory>,
        config: ReplicationConfig,
        self_url: Option<String>,
    ) -> Self {
        Self {
            resolver,
            factory,
            config,
            self_url,
            peers: DashMap::new(),
        }
    }

    /// Re-resolve the peer list, starting workers for new peers and
    /// retiring workers for removed ones.
    pub async fn refresh(&self) -> Result<()> {
        let mut resolved: HashSet<String> = self.resolver.resolve().await?.into_iter().collect();
        if let Some(self_url) = &self.self_url {
            resolved.remove(self_url);
        }

        // Retire peers that disappeared from the resolved list.
        let stale: Vec<String> = self
            .peers
            .iter()
            .filter(|entry| !resolved.contains(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        for url in stale {
            if let Some((_, handle)) = self.peers.remove(&url) {
                info!(peer = %url, "Peer removed, retiring replication worker");
                // Dropping the sender lets the worker drain and exit.
                drop(handle.tx);
                drop(handle.worker);
            }
        }

        // Start workers for newly resolved peers.
        for url in resolved {
            if self.peers.contains_key(&url) {
                continue;
            }
            let (tx, rx) = mpsc::channel(self.config.queue_capacity);
            let transport = self.factory.create(&url);
            let worker = tokio::spawn(run_peer_worker(
                url.clone(),
                transport,
                rx,
                self.config.clone(),
            ));
            info!(peer = %url, "Peer added, replication worker started");
            self.peers.insert(url, PeerHandle { tx, worker });
        }

        Ok(())
    }

    /// Enqueue an instruction for every known peer.
    ///
    /// A full peer queue drops the instruction with a warning; the local
    /// write already succeeded and replication stays best-effort.
    pub fn broadcast(&self, instruction: ReplicationInstruction) {
        for entry in self.peers.iter() {
            if let Err(e) = entry.value().tx.try_send(instruction.clone()) {
                warn!(
                    peer = %entry.key(),
                    error = %e,
                    "Dropping replication instruction for saturated peer queue"
                );
            }
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn peer_urls(&self) -> Vec<String> {
        self.peers.iter().map(|e| e.key().clone()).collect()
    }

    /// Drop all peer queues; workers drain what is pending and exit.
    pub fn shutdown(&self) {
        self.peers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_registry::{LeaseRegistry, RegistryConfig};
    use beacon_transport::InMemoryTransport;
    use std::sync::Mutex;

    struct SwappableResolver {
        peers: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PeerResolver for SwappableResolver {
        async fn resolve(&self) -> Result<Vec<String>> {
            Ok(self.peers.lock().unwrap().clone())
        }
    }

    struct LocalFactory;

    impl PeerTransportFactory for LocalFactory {
        fn create(&self, _base_url: &str) -> Arc<dyn RegistryTransport> {
            let registry = Arc::new(LeaseRegistry::new(RegistryConfig::default()).unwrap());
            Arc::new(InMemoryTransport::new(registry))
        }
    }

    #[tokio::test]
    async fn refresh_tracks_membership_changes() {
        let resolver = Arc::new(SwappableResolver {
            peers: Mutex::new(vec!["http://a".into(), "http://b".into()]),
        });
        let set = PeerNodeSet::new(
            resolver.clone(),
            Arc::new(LocalFactory),
            ReplicationConfig::default(),
            None,
        );

        set.refresh().await.unwrap();
        assert_eq!(set.peer_count(), 2);

        *resolver.peers.lock().unwrap() = vec!["http://b".into(), "http://c".into()];
        set.refresh().await.unwrap();

        let mut urls = set.peer_urls();
        urls.sort();
        assert_eq!(urls, vec!["http://b".to_string(), "http://c".to_string()]);
    }

    #[tokio::test]
    async fn self_url_is_excluded() {
        let resolver = Arc::new(SwappableResolver {
            peers: Mutex::new(vec!["http://self".into(), "http://other".into()]),
        });
        let set = PeerNodeSet::new(
            resolver,
            Arc::new(LocalFactory),
            ReplicationConfig::default(),
            Some("http://self".into()),
        );

        set.refresh().await.unwrap();
        assert_eq!(set.peer_urls(), vec!["http://other".to_string()]);
    }
}
