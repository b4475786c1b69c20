//! Instance records
//!
//! An InstanceRecord identifies one running service instance as seen by the
//! registry. The dirty timestamp is the logical modification time used for
//! last-writer-wins conflict resolution across replicas.

use crate::InstanceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health status of a registered instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    /// Instance is starting up and not ready for traffic
    Starting,
    /// Instance is healthy and serving
    Up,
    /// Instance reported itself unhealthy
    Down,
    /// Instance was administratively taken out of rotation
    OutOfService,
    /// Status has not been reported yet
    Unknown,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Starting => "STARTING",
            InstanceStatus::Up => "UP",
            InstanceStatus::Down => "DOWN",
            InstanceStatus::OutOfService => "OUT_OF_SERVICE",
            InstanceStatus::Unknown => "UNKNOWN",
        }
    }
}

impl Default for InstanceStatus {
    fn default() -> Self {
        InstanceStatus::Unknown
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registered service instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Unique instance identifier (within the application)
    pub instance_id: InstanceId,

    /// Application (service) name this instance belongs to
    pub app_name: String,

    /// Host name or address the instance is reachable at
    pub host_name: String,

    /// Plain listening port
    pub port: u16,

    /// TLS listening port, if any
    #[serde(default)]
    pub secure_port: Option<u16>,

    /// Virtual address used for client-side lookup across applications
    #[serde(default)]
    pub vip_address: Option<String>,

    /// Availability zone
    #[serde(default)]
    pub zone: Option<String>,

    /// Region
    #[serde(default)]
    pub region: Option<String>,

    /// Current health status
    pub status: InstanceStatus,

    /// Last local modification time in epoch milliseconds.
    ///
    /// Monotonically increasing per instance; replicas apply a write only if
    /// its dirty timestamp is not older than what they already hold.
    pub dirty_timestamp: i64,

    /// Per-instance lease duration override in seconds
    #[serde(default)]
    pub lease_duration_secs: Option<u64>,
}

impl InstanceRecord {
    /// Create a record with status UNKNOWN and the dirty timestamp set to now.
    pub fn new(app_name: impl Into<String>, instance_id: InstanceId, host_name: impl Into<String>, port: u16) -> Self {
        Self {
            instance_id,
            app_name: app_name.into(),
            host_name: host_name.into(),
            port,
            secure_port: None,
            vip_address: None,
            zone: None,
            region: None,
            status: InstanceStatus::Unknown,
            dirty_timestamp: Utc::now().timestamp_millis(),
            lease_duration_secs: None,
        }
    }

    /// Bump the dirty timestamp.
    ///
    /// Never decreases, even if the wall clock stepped backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let candidate = now.timestamp_millis();
        self.dirty_timestamp = candidate.max(self.dirty_timestamp + 1);
    }

    /// Update the status and bump the dirty timestamp in one step.
    pub fn set_status(&mut self, status: InstanceStatus, now: DateTime<Utc>) {
        self.status = status;
        self.touch(now);
    }

    pub fn with_status(mut self, status: InstanceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_vip_address(mut self, vip: impl Into<String>) -> Self {
        self.vip_address = Some(vip.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_lease_duration(mut self, secs: u64) -> Self {
        self.lease_duration_secs = Some(secs);
        self
    }
}
