//! In-process transport over a local registry
//!
//! Suitable for tests and embedded single-node setups; production talks
//! HTTP through [`crate::HttpRegistryTransport`].

use crate::error::Result;
use crate::transport::RegistryTransport;
use crate::wire::{DeltaResponse, FullRegistryResponse, ReplicationInstruction, WriteAck};
use async_trait::async_trait;
use beacon_registry::{LeaseRegistry, ResponseCache};
use beacon_types::{InstanceId, InstanceRecord, InstanceStatus};
use std::sync::Arc;

/// Direct calls into a local lease registry
pub struct InMemoryTransport {
    registry: Arc<LeaseRegistry>,
    cache: Arc<ResponseCache>,
}

impl InMemoryTransport {
    pub fn new(registry: Arc<LeaseRegistry>) -> Self {
        let cache = Arc::new(ResponseCache::new(registry.clone()));
        Self { registry, cache }
    }

    pub fn registry(&self) -> &Arc<LeaseRegistry> {
        &self.registry
    }
}

#[async_trait]
impl RegistryTransport for InMemoryTransport {
    async fn register(
        &self,
        record: InstanceRecord,
        lease_duration_secs: Option<u64>,
        is_replication: bool,
    ) -> Result<WriteAck> {
        Ok(self
            .registry
            .register(record, lease_duration_secs, is_replication)
            .into())
    }

    async fn renew(
        &self,
        app_name: &str,
        instance_id: &InstanceId,
        is_replication: bool,
    ) -> Result<WriteAck> {
        Ok(self.registry.renew(app_name, instance_id, is_replication).into())
    }

    async fn cancel(
        &self,
        app_name: &str,
        instance_id: &InstanceId,
        is_replication: bool,
    ) -> Result<WriteAck> {
        Ok(self.registry.cancel(app_name, instance_id, is_replication).into())
    }

    async fn status_update(
        &self,
        app_name: &str,
        instance_id: &InstanceId,
        status: InstanceStatus,
        dirty_timestamp: i64,
        is_replication: bool,
    ) -> Result<WriteAck> {
        Ok(self
            .registry
            .status_update(app_name, instance_id, status, dirty_timestamp, is_replication)
            .into())
    }

    async fn fetch_full(&self) -> Result<FullRegistryResponse> {
        let view = self.cache.full().await;
        Ok(FullRegistryResponse {
            applications: (*view.applications).clone(),
            checksum: view.checksum,
        })
    }

    async fn fetch_delta(&self) -> Result<DeltaResponse> {
        let delta = self.cache.delta().await;
        Ok(DeltaResponse {
            entries: delta.entries,
            checksum: delta.checksum,
        })
    }

    async fn fetch_app(&self, app_name: &str) -> Result<Vec<InstanceRecord>> {
        let view = self.cache.full().await;
        Ok(view.applications.get(app_name).to_vec())
    }

    async fn fetch_region(&self, region: &str) -> Result<Vec<InstanceRecord>> {
        let view = self.cache.full().await;
        Ok(view
            .applications
            .instances_by_region(region)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn fetch_vip(&self, vip_address: &str) -> Result<Vec<InstanceRecord>> {
        let view = self.cache.full().await;
        Ok(view
            .applications
            .instances_by_vip(vip_address)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn submit_batch(&self, batch: Vec<ReplicationInstruction>) -> Result<Vec<WriteAck>> {
        let mut acks = Vec::with_capacity(batch.len());
        for instruction in batch {
            let ack = match instruction {
                ReplicationInstruction::Register {
                    record,
                    lease_duration_secs,
                } => self.registry.register(record, lease_duration_secs, true),
                ReplicationInstruction::Renew {
                    app_name,
                    instance_id,
                } => self.registry.renew(&app_name, &instance_id, true),
                ReplicationInstruction::Cancel {
                    app_name,
                    instance_id,
                } => self.registry.cancel(&app_name, &instance_id, true),
                ReplicationInstruction::StatusUpdate { record } => self.registry.status_update(
                    &record.app_name,
                    &record.instance_id,
                    record.status,
                    record.dirty_timestamp,
                    true,
                ),
            };
            acks.push(ack.into());
        }
        Ok(acks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_registry::RegistryConfig;

    fn transport() -> InMemoryTransport {
        let registry = Arc::new(LeaseRegistry::new(RegistryConfig::default()).unwrap());
        InMemoryTransport::new(registry)
    }

    fn record(app: &str, id: &str) -> InstanceRecord {
        InstanceRecord::new(app, InstanceId::new(id), "10.0.0.1", 8080)
            .with_status(InstanceStatus::Up)
    }

    #[tokio::test]
    async fn register_then_fetch_full() {
        let t = transport();
        let ack = t.register(record("billing", "i-1"), None, false).await.unwrap();
        assert_eq!(ack, WriteAck::Applied);

        let full = t.fetch_full().await.unwrap();
        assert_eq!(full.applications.get("billing").len(), 1);
        assert_eq!(full.checksum, full.applications.checksum());
    }

    #[tokio::test]
    async fn batch_applies_in_order() {
        let t = transport();
        let acks = t
            .submit_batch(vec![
                ReplicationInstruction::Register {
                    record: record("billing", "i-1"),
                    lease_duration_secs: None,
                },
                ReplicationInstruction::Cancel {
                    app_name: "billing".into(),
                    instance_id: InstanceId::new("i-1"),
                },
                ReplicationInstruction::Renew {
                    app_name: "billing".into(),
                    instance_id: InstanceId::new("i-1"),
                },
            ])
            .await
            .unwrap();

        assert_eq!(acks, vec![WriteAck::Applied, WriteAck::Applied, WriteAck::NotFound]);
    }
}
