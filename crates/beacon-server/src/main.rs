//! Beacon Daemon - service discovery registry node
//!
//! One `beacond` process serves:
//! - the registration/renewal/cancel write API
//! - cached full and delta read views for clients
//! - the replication endpoint peers push batched mutations to
//!
//! Peer nodes are configured statically; each local write is fanned out to
//! all of them asynchronously.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod server;
mod state;

use config::DaemonConfig;
use error::DaemonResult;
use server::Server;

/// Beacon Daemon CLI
#[derive(Parser)]
#[command(name = "beacond")]
#[command(about = "Beacon daemon - service discovery registry node", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "BEACON_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "BEACON_LISTEN_ADDR")]
    listen: Option<String>,

    /// Peer base URLs, comma separated
    #[arg(long, env = "BEACON_PEERS", value_delimiter = ',')]
    peers: Vec<String>,

    /// This node's externally reachable base URL
    #[arg(long, env = "BEACON_SELF_URL")]
    self_url: Option<String>,

    /// Log level
    #[arg(long, env = "BEACON_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "BEACON_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| error::DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| error::DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if !cli.peers.is_empty() {
        config.peers = cli.peers;
    }
    if cli.self_url.is_some() {
        config.self_url = cli.self_url;
    }

    config
        .registry
        .validate()
        .map_err(|e| error::DaemonError::Config(e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        peers = config.peers.len(),
        "Starting beacon daemon"
    );

    // Create and run server
    let server = Server::new(config)?;
    server.run().await
}
