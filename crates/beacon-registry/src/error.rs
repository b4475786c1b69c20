//! Registry error types

use thiserror::Error;

/// Registry errors
///
/// Absence of a lease is not an error; write operations report it through
/// `WriteOutcome::NotFound`.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid registry configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
