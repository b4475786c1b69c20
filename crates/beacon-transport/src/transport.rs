//! The registry transport trait

use crate::error::Result;
use crate::wire::{DeltaResponse, FullRegistryResponse, ReplicationInstruction, WriteAck};
use async_trait::async_trait;
use beacon_types::{InstanceId, InstanceRecord, InstanceStatus};

/// Everything a registry node answers, as seen from the other side of the
/// wire.
///
/// The client cache, the heartbeat scheduler and the peer replicator all
/// depend on this trait only; swapping HTTP for anything else is a matter
/// of providing another implementation.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Register an instance, optionally overriding the lease duration.
    async fn register(
        &self,
        record: InstanceRecord,
        lease_duration_secs: Option<u64>,
        is_replication: bool,
    ) -> Result<WriteAck>;

    /// Renew the lease for an instance.
    async fn renew(
        &self,
        app_name: &str,
        instance_id: &InstanceId,
        is_replication: bool,
    ) -> Result<WriteAck>;

    /// Cancel (deregister) an instance.
    async fn cancel(
        &self,
        app_name: &str,
        instance_id: &InstanceId,
        is_replication: bool,
    ) -> Result<WriteAck>;

    /// Update the reported status of an instance.
    async fn status_update(
        &self,
        app_name: &str,
        instance_id: &InstanceId,
        status: InstanceStatus,
        dirty_timestamp: i64,
        is_replication: bool,
    ) -> Result<WriteAck>;

    /// Fetch the full registry snapshot plus checksum.
    async fn fetch_full(&self) -> Result<FullRegistryResponse>;

    /// Fetch the retained change entries plus the current full checksum.
    async fn fetch_delta(&self) -> Result<DeltaResponse>;

    /// Fetch instances of one application, filtered server-side.
    async fn fetch_app(&self, app_name: &str) -> Result<Vec<InstanceRecord>>;

    /// Fetch instances matching a vip address, filtered server-side.
    async fn fetch_vip(&self, vip_address: &str) -> Result<Vec<InstanceRecord>>;

    /// Fetch instances registered in a region, filtered server-side.
    async fn fetch_region(&self, region: &str) -> Result<Vec<InstanceRecord>>;

    /// Submit a batch of replication instructions; acks come back in order.
    async fn submit_batch(&self, batch: Vec<ReplicationInstruction>) -> Result<Vec<WriteAck>>;
}
