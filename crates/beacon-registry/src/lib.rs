//! Beacon Registry - the server-side instance store
//!
//! This crate owns the authoritative state of one registry node:
//!
//! - **Lease**: TTL and renewal bookkeeping for one registered instance
//! - **LeaseRegistry**: concurrent application → instance → lease store with
//!   the write API, the eviction sweep and the self-preservation valve
//! - **RecentChangeQueue**: the retention-bounded queue answering delta
//!   fetches
//! - **ResponseCache**: cached full snapshot + checksum for the read API
//!
//! Replication and transport live elsewhere; the registry announces applied
//! local mutations on a broadcast channel and peers consume it from there.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod lease;
pub mod recent_changes;
pub mod registry;
pub mod response_cache;

pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use lease::Lease;
pub use recent_changes::RecentChangeQueue;
pub use registry::{EvictionSweep, LeaseRegistry, RegistryMutation, WriteOutcome};
pub use response_cache::ResponseCache;
