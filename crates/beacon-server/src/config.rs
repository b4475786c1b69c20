//! Configuration for the beacon daemon

use beacon_registry::RegistryConfig;
use beacon_replication::ReplicationConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Lease registry tunables
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Peer replication tunables
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Static peer base URLs (this node's own URL is filtered out)
    #[serde(default)]
    pub peers: Vec<String>,

    /// This node's externally reachable base URL
    #[serde(default)]
    pub self_url: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            registry: RegistryConfig::default(),
            replication: ReplicationConfig::default(),
            peers: Vec::new(),
            self_url: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,

    /// Timeout for outbound peer requests in seconds
    #[serde(default = "default_peer_timeout")]
    pub peer_request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            peer_request_timeout_secs: default_peer_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:8761".parse().unwrap()
}

fn default_peer_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from defaults, an optional file, and `BEACON_`
    /// environment variables, in that order of precedence.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("BEACON")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
