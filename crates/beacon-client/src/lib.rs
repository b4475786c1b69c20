//! Beacon Client - the discovery-side half of the registry protocol
//!
//! A `BeaconClient` keeps a local read replica of the server's registry:
//! one full bootstrap fetch, then periodic delta fetches verified by
//! checksum with a transparent fall back to re-bootstrap on divergence. It
//! also renews this process's own lease on its own schedule and re-registers
//! when the server forgot it.
//!
//! Lookups (`instances_of`, `instances_by_vip`, ...) are pure reads against
//! the last committed snapshot; they never touch the network and return
//! empty results for unknown applications.

#![deny(unsafe_code)]

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod heartbeat;

pub use cache::{CacheState, ClientRegistryCache};
pub use client::BeaconClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use events::{BeaconEvent, EventDispatcher, EventListener};
pub use health::{HealthCheckHandler, StaticHealthCheck};
pub use heartbeat::HeartbeatScheduler;
