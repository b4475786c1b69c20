//! Beacon Types - Core data model for the service-discovery registry
//!
//! Both halves of the system share this vocabulary:
//!
//! - **InstanceRecord**: one registered service instance
//! - **Applications**: the application name → instance list snapshot shape
//! - **DeltaEntry**: one entry of the recent-change queue
//! - **registry_checksum**: the consistency checksum clients use to verify
//!   that an incrementally patched cache matches the server's full view
//!
//! Types here are pure data; all registry and replication behavior lives in
//! the `beacon-registry`, `beacon-replication` and `beacon-client` crates.

#![deny(unsafe_code)]

pub mod applications;
pub mod checksum;
pub mod delta;
pub mod ids;
pub mod record;

pub use applications::Applications;
pub use checksum::registry_checksum;
pub use delta::{ActionType, DeltaEntry};
pub use ids::InstanceId;
pub use record::{InstanceRecord, InstanceStatus};
