//! Pluggable health checks
//!
//! The client polls the handler on its own schedule; the returned status is
//! what the next heartbeat or registration reports to the server.

use async_trait::async_trait;
use beacon_types::InstanceStatus;

/// Application-supplied health check
#[async_trait]
pub trait HealthCheckHandler: Send + Sync {
    /// Determine the status to report, given the currently reported one.
    async fn current_status(&self, reported: InstanceStatus) -> InstanceStatus;
}

/// Fixed-status handler, the default when the application supplies none.
pub struct StaticHealthCheck(pub InstanceStatus);

#[async_trait]
impl HealthCheckHandler for StaticHealthCheck {
    async fn current_status(&self, _reported: InstanceStatus) -> InstanceStatus {
        self.0
    }
}
