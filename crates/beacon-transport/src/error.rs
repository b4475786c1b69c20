//! Transport error types

use thiserror::Error;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer or server could not be reached at all
    #[error("Registry unreachable: {0}")]
    Unreachable(String),

    /// The server answered with an unexpected HTTP status
    #[error("Unexpected response status: {status}")]
    UnexpectedStatus { status: u16 },

    /// The response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Unreachable(err.to_string())
        }
    }
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;
