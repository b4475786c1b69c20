//! Application state for API handlers

use beacon_registry::{LeaseRegistry, ResponseCache};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The lease registry
    pub registry: Arc<LeaseRegistry>,

    /// Read-side cache of full and delta views
    pub cache: Arc<ResponseCache>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(registry: Arc<LeaseRegistry>, cache: Arc<ResponseCache>) -> Self {
        Self {
            registry,
            cache,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Uptime in whole seconds.
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }
}
