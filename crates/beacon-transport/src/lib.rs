//! Beacon Transport - the protocol shared by clients, servers and peers
//!
//! The [`RegistryTransport`] trait is the single seam between registry
//! logic and the network: the client-side cache, the heartbeat scheduler
//! and the peer replicator all speak through it. Two implementations ship
//! here:
//!
//! - [`HttpRegistryTransport`]: reqwest against a registry node's REST API
//! - [`InMemoryTransport`]: direct calls into a local [`beacon_registry`]
//!   store, for tests and embedded setups

#![deny(unsafe_code)]

pub mod error;
pub mod http;
pub mod memory;
pub mod transport;
pub mod wire;

pub use error::{Result, TransportError};
pub use http::{HttpRegistryTransport, REPLICATION_HEADER};
pub use memory::InMemoryTransport;
pub use transport::RegistryTransport;
pub use wire::{
    BatchResponse, DeltaResponse, FullRegistryResponse, RegisterRequest, ReplicationInstruction,
    StatusUpdateRequest, WriteAck,
};
