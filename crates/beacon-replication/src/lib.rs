//! Beacon Replication - asynchronous peer-to-peer mutation fan-out
//!
//! Every locally applied, non-replicated mutation of the lease registry is
//! turned into a [`beacon_transport::ReplicationInstruction`] and pushed to
//! every known peer. Delivery is best-effort: bounded per-peer queues,
//! batch submission with coalescing, bounded retry with backoff, and a
//! dropped-and-logged failure mode. The local write path never waits on a
//! peer.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod node_set;
pub mod replicator;
pub mod worker;

pub use config::ReplicationConfig;
pub use error::{ReplicationError, Result};
pub use node_set::{PeerNodeSet, PeerResolver, PeerTransportFactory, StaticPeerResolver};
pub use replicator::PeerReplicator;
