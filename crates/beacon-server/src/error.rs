//! Daemon error types

use thiserror::Error;

/// Daemon errors
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Registry(#[from] beacon_registry::RegistryError),

    #[error(transparent)]
    Replication(#[from] beacon_replication::ReplicationError),
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
