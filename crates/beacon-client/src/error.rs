//! Client error types

use thiserror::Error;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transport failure: {0}")]
    Transport(#[from] beacon_transport::TransportError),

    #[error("Checksum mismatch: local {local}, server {server}")]
    ChecksumMismatch { local: String, server: String },

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
