//! Configuration for peer replication

use crate::error::{ReplicationError, Result};
use serde::{Deserialize, Serialize};

/// Tunables of the peer replicator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Capacity of each peer's pending-instruction queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Maximum instructions drained into one batch submission
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Delivery attempts per batch before it is dropped
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Initial retry backoff in milliseconds, doubled per attempt
    #[serde(default = "default_initial_backoff")]
    pub retry_initial_backoff_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_backoff")]
    pub retry_max_backoff_ms: u64,

    /// Interval between peer list refreshes in seconds
    #[serde(default = "default_peer_refresh")]
    pub peer_refresh_interval_secs: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
            retry_attempts: default_retry_attempts(),
            retry_initial_backoff_ms: default_initial_backoff(),
            retry_max_backoff_ms: default_max_backoff(),
            peer_refresh_interval_secs: default_peer_refresh(),
        }
    }
}

impl ReplicationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(ReplicationError::InvalidConfig(
                "queue_capacity must be > 0".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ReplicationError::InvalidConfig(
                "batch_size must be > 0".into(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(ReplicationError::InvalidConfig(
                "retry_attempts must be > 0".into(),
            ));
        }
        if self.peer_refresh_interval_secs == 0 {
            return Err(ReplicationError::InvalidConfig(
                "peer_refresh_interval_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Backoff for the given zero-based attempt, doubled and capped.
    pub fn backoff_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let ms = self
            .retry_initial_backoff_ms
            .saturating_mul(1u64 << attempt.min(16))
            .min(self.retry_max_backoff_ms);
        std::time::Duration::from_millis(ms)
    }
}

// Default value helpers
fn default_queue_capacity() -> usize {
    1024
}

fn default_batch_size() -> usize {
    64
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    250
}

fn default_max_backoff() -> u64 {
    5_000
}

fn default_peer_refresh() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ReplicationConfig::default().validate().unwrap();
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = ReplicationConfig::default();
        assert_eq!(config.backoff_for_attempt(0).as_millis(), 250);
        assert_eq!(config.backoff_for_attempt(1).as_millis(), 500);
        assert_eq!(config.backoff_for_attempt(10).as_millis(), 5_000);
    }

    #[test]
    fn zero_batch_size_rejected() {
        let config = ReplicationConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
