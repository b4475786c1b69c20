//! HTTP implementation of the registry transport

use crate::error::{Result, TransportError};
use crate::transport::RegistryTransport;
use crate::wire::{
    BatchResponse, DeltaResponse, FullRegistryResponse, RegisterRequest, ReplicationInstruction,
    StatusUpdateRequest, WriteAck,
};
use async_trait::async_trait;
use beacon_types::{InstanceId, InstanceRecord, InstanceStatus};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Header marking a write as replication-received, so the accepting node
/// does not fan it out again.
pub const REPLICATION_HEADER: &str = "x-beacon-replication";

/// reqwest-backed transport against one registry node's REST API
pub struct HttpRegistryTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRegistryTransport {
    /// `base_url` without a trailing slash, e.g. `http://registry-1:8761`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        Ok(Self::with_client(base_url, client))
    }

    /// Reuse an already-built client, e.g. one shared across peers.
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn write_ack(status: StatusCode) -> Result<WriteAck> {
        match status {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(WriteAck::Applied),
            StatusCode::NOT_FOUND => Ok(WriteAck::NotFound),
            StatusCode::CONFLICT => Ok(WriteAck::Stale),
            other => Err(TransportError::UnexpectedStatus {
                status: other.as_u16(),
            }),
        }
    }

    fn replication_flag(
        builder: reqwest::RequestBuilder,
        is_replication: bool,
    ) -> reqwest::RequestBuilder {
        if is_replication {
            builder.header(REPLICATION_HEADER, "true")
        } else {
            builder
        }
    }
}

#[async_trait]
impl RegistryTransport for HttpRegistryTransport {
    async fn register(
        &self,
        record: InstanceRecord,
        lease_duration_secs: Option<u64>,
        is_replication: bool,
    ) -> Result<WriteAck> {
        let url = self.url(&format!("/v1/apps/{}", record.app_name));
        let body = RegisterRequest {
            record,
            lease_duration_secs,
        };
        let builder = self.client.post(&url).json(&body);
        let response = Self::replication_flag(builder, is_replication).send().await?;
        Self::write_ack(response.status())
    }

    async fn renew(
        &self,
        app_name: &str,
        instance_id: &InstanceId,
        is_replication: bool,
    ) -> Result<WriteAck> {
        let url = self.url(&format!("/v1/apps/{app_name}/{instance_id}/renew"));
        let builder = self.client.put(&url);
        let response = Self::replication_flag(builder, is_replication).send().await?;
        Self::write_ack(response.status())
    }

    async fn cancel(
        &self,
        app_name: &str,
        instance_id: &InstanceId,
        is_replication: bool,
    ) -> Result<WriteAck> {
        let url = self.url(&format!("/v1/apps/{app_name}/{instance_id}"));
        let builder = self.client.delete(&url);
        let response = Self::replication_flag(builder, is_replication).send().await?;
        Self::write_ack(response.status())
    }

    async fn status_update(
        &self,
        app_name: &str,
        instance_id: &InstanceId,
        status: InstanceStatus,
        dirty_timestamp: i64,
        is_replication: bool,
    ) -> Result<WriteAck> {
        let url = self.url(&format!("/v1/apps/{app_name}/{instance_id}/status"));
        let body = StatusUpdateRequest {
            status,
            dirty_timestamp,
        };
        let builder = self.client.put(&url).json(&body);
        let response = Self::replication_flag(builder, is_replication).send().await?;
        Self::write_ack(response.status())
    }

    async fn fetch_full(&self) -> Result<FullRegistryResponse> {
        let url = self.url("/v1/apps");
        debug!(url = %url, "Fetching full registry");
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::UnexpectedStatus {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn fetch_delta(&self) -> Result<DeltaResponse> {
        let url = self.url("/v1/apps/delta");
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::UnexpectedStatus {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn fetch_app(&self, app_name: &str) -> Result<Vec<InstanceRecord>> {
        let url = self.url(&format!("/v1/apps/{app_name}"));
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => Ok(response.json().await?),
            other => Err(TransportError::UnexpectedStatus {
                status: other.as_u16(),
            }),
        }
    }

    async fn fetch_region(&self, region: &str) -> Result<Vec<InstanceRecord>> {
        let url = self.url(&format!("/v1/regions/{region}"));
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => Ok(response.json().await?),
            other => Err(TransportError::UnexpectedStatus {
                status: other.as_u16(),
            }),
        }
    }

    async fn fetch_vip(&self, vip_address: &str) -> Result<Vec<InstanceRecord>> {
        let url = self.url(&format!("/v1/vips/{vip_address}"));
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => Ok(response.json().await?),
            other => Err(TransportError::UnexpectedStatus {
                status: other.as_u16(),
            }),
        }
    }

    async fn submit_batch(&self, batch: Vec<ReplicationInstruction>) -> Result<Vec<WriteAck>> {
        let url = self.url("/v1/replication/batch");
        let response = self
            .client
            .post(&url)
            .header(REPLICATION_HEADER, "true")
            .json(&batch)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TransportError::UnexpectedStatus {
                status: response.status().as_u16(),
            });
        }
        let decoded: BatchResponse = response.json().await?;
        Ok(decoded.acks)
    }
}
