//! Configuration for a registry node

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};

/// Tunables of the server-side registry.
///
/// Supplied once at construction; the registry never mutates it at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Interval between eviction sweeps in seconds
    #[serde(default = "default_eviction_interval")]
    pub eviction_interval_secs: u64,

    /// How long recent-change entries are retained for delta fetches, seconds
    #[serde(default = "default_delta_retention")]
    pub delta_retention_secs: u64,

    /// Lease duration granted when a registration carries no override, seconds
    #[serde(default = "default_lease_duration")]
    pub default_lease_duration_secs: u64,

    /// Fraction of registered instances that must still hold a live lease for
    /// eviction to run at all. Below this, self-preservation suspends the
    /// sweep.
    #[serde(default = "default_renewal_percent")]
    pub renewal_percent_threshold: f64,

    /// Whether the self-preservation valve is active
    #[serde(default = "default_true")]
    pub self_preservation_enabled: bool,

    /// Maximum fraction of the registry evicted in one sweep
    #[serde(default = "default_eviction_burst")]
    pub eviction_burst_fraction: f64,

    /// Interval at which the response cache refreshes its snapshot, seconds
    #[serde(default = "default_cache_interval")]
    pub cache_update_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            eviction_interval_secs: default_eviction_interval(),
            delta_retention_secs: default_delta_retention(),
            default_lease_duration_secs: default_lease_duration(),
            renewal_percent_threshold: default_renewal_percent(),
            self_preservation_enabled: true,
            eviction_burst_fraction: default_eviction_burst(),
            cache_update_interval_secs: default_cache_interval(),
        }
    }
}

impl RegistryConfig {
    /// Reject configurations that would break the registry at runtime.
    ///
    /// Called once at startup; an error here is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.eviction_interval_secs == 0 {
            return Err(RegistryError::InvalidConfig(
                "eviction_interval_secs must be > 0".into(),
            ));
        }
        if self.delta_retention_secs == 0 {
            return Err(RegistryError::InvalidConfig(
                "delta_retention_secs must be > 0".into(),
            ));
        }
        if self.default_lease_duration_secs == 0 {
            return Err(RegistryError::InvalidConfig(
                "default_lease_duration_secs must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.renewal_percent_threshold)
            || self.renewal_percent_threshold == 0.0
        {
            return Err(RegistryError::InvalidConfig(
                "renewal_percent_threshold must be in (0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.eviction_burst_fraction)
            || self.eviction_burst_fraction == 0.0
        {
            return Err(RegistryError::InvalidConfig(
                "eviction_burst_fraction must be in (0, 1]".into(),
            ));
        }
        if self.cache_update_interval_secs == 0 {
            return Err(RegistryError::InvalidConfig(
                "cache_update_interval_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_eviction_interval() -> u64 {
    60
}

fn default_delta_retention() -> u64 {
    180
}

fn default_lease_duration() -> u64 {
    90
}

fn default_renewal_percent() -> f64 {
    0.85
}

fn default_eviction_burst() -> f64 {
    0.15
}

fn default_cache_interval() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RegistryConfig::default();
        config.validate().unwrap();
        assert_eq!(config.eviction_interval_secs, 60);
        assert_eq!(config.delta_retention_secs, 180);
        assert!(config.self_preservation_enabled);
    }

    #[test]
    fn zero_interval_rejected() {
        let config = RegistryConfig {
            eviction_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_outside_unit_interval_rejected() {
        let config = RegistryConfig {
            renewal_percent_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RegistryConfig {
            renewal_percent_threshold: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
