//! Replication error types

use thiserror::Error;

/// Replication errors
#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("Peer resolution failed: {0}")]
    Resolver(String),

    #[error("Invalid replication configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for replication operations
pub type Result<T> = std::result::Result<T, ReplicationError>;
