//! Server setup and lifecycle management

use crate::api::create_router;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::state::AppState;
use beacon_registry::{LeaseRegistry, ResponseCache};
use beacon_replication::{PeerNodeSet, PeerReplicator, PeerTransportFactory, StaticPeerResolver};
use beacon_transport::{HttpRegistryTransport, RegistryTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// One reqwest client shared by every peer transport.
struct HttpPeerFactory {
    client: reqwest::Client,
}

impl PeerTransportFactory for HttpPeerFactory {
    fn create(&self, base_url: &str) -> Arc<dyn RegistryTransport> {
        Arc::new(HttpRegistryTransport::with_client(
            base_url,
            self.client.clone(),
        ))
    }
}

/// Beacon registry daemon
pub struct Server {
    config: DaemonConfig,
    registry: Arc<LeaseRegistry>,
    cache: Arc<ResponseCache>,
    replicator: Arc<PeerReplicator>,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        config.replication.validate()?;

        let registry = Arc::new(LeaseRegistry::new(config.registry.clone())?);
        let cache = Arc::new(ResponseCache::new(registry.clone()));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.server.peer_request_timeout_secs))
            .build()
            .map_err(|e| DaemonError::Server(e.to_string()))?;
        let nodes = Arc::new(PeerNodeSet::new(
            Arc::new(StaticPeerResolver::new(config.peers.clone())),
            Arc::new(HttpPeerFactory { client }),
            config.replication.clone(),
            config.self_url.clone(),
        ));
        let replicator = Arc::new(PeerReplicator::new(nodes, config.replication.clone()));

        Ok(Self {
            config,
            registry,
            cache,
            replicator,
        })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let (shutdown_tx, _) = watch::channel(false);

        let state = AppState::new(self.registry.clone(), self.cache.clone());
        let app = create_router(state);

        let listener = TcpListener::bind(addr).await?;

        tracing::info!(%addr, peers = self.config.peers.len(), "Beacon daemon listening");

        // Background loops: lease eviction, response cache warming, peer
        // replication.
        let eviction = tokio::spawn(
            self.registry
                .clone()
                .run_eviction_loop(shutdown_tx.subscribe()),
        );
        let cache_refresh = tokio::spawn(self.cache.clone().run_refresh_loop(
            self.config.registry.cache_update_interval_secs,
            shutdown_tx.subscribe(),
        ));
        let mutations = self.registry.subscribe_mutations();
        let replicator = self.replicator.clone();
        let replication_rx = shutdown_tx.subscribe();
        let replication =
            tokio::spawn(async move { replicator.run(mutations, replication_rx).await });

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Beacon daemon shutting down");

        let _ = shutdown_tx.send(true);
        let _ = tokio::time::timeout(Duration::from_secs(5), async {
            let _ = eviction.await;
            let _ = cache_refresh.await;
            let _ = replication.await;
        })
        .await;

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
