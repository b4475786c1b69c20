//! Client configuration

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};

/// Tunables of the discovery client.
///
/// Supplied once at construction and never mutated by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Interval between registry cache refreshes in seconds
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_secs: u64,

    /// Interval between lease renewals in seconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Lease duration requested on registration, seconds
    #[serde(default = "default_lease_duration")]
    pub lease_duration_secs: u64,

    /// Ceiling for the escalating heartbeat/registration backoff, seconds
    #[serde(default = "default_backoff_ceiling")]
    pub backoff_ceiling_secs: u64,

    /// Per-listener time budget for event dispatch, milliseconds
    #[serde(default = "default_listener_timeout")]
    pub listener_timeout_ms: u64,

    /// Consecutive heartbeat failures before the client reports degraded
    #[serde(default = "default_degraded_threshold")]
    pub degraded_failure_threshold: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            fetch_interval_secs: default_fetch_interval(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            lease_duration_secs: default_lease_duration(),
            backoff_ceiling_secs: default_backoff_ceiling(),
            listener_timeout_ms: default_listener_timeout(),
            degraded_failure_threshold: default_degraded_threshold(),
        }
    }
}

impl ClientConfig {
    /// Fatal at startup; the client refuses to run on a broken config.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_interval_secs == 0 {
            return Err(ClientError::InvalidConfig(
                "fetch_interval_secs must be > 0".into(),
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ClientError::InvalidConfig(
                "heartbeat_interval_secs must be > 0".into(),
            ));
        }
        if self.lease_duration_secs == 0 {
            return Err(ClientError::InvalidConfig(
                "lease_duration_secs must be > 0".into(),
            ));
        }
        if self.degraded_failure_threshold == 0 {
            return Err(ClientError::InvalidConfig(
                "degraded_failure_threshold must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// The cache counts as fresh within two fetch intervals of the last
    /// successful sync.
    pub fn freshness_window_secs(&self) -> u64 {
        self.fetch_interval_secs * 2
    }
}

// Default value helpers
fn default_fetch_interval() -> u64 {
    30
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_lease_duration() -> u64 {
    90
}

fn default_backoff_ceiling() -> u64 {
    120
}

fn default_listener_timeout() -> u64 {
    2_000
}

fn default_degraded_threshold() -> u32 {
    3
}
