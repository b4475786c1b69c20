//! HTTP API
//!
//! Writes answer with a [`WriteAck`] body; the status code mirrors the ack
//! (200 applied, 404 unknown lease, 409 stale write) so peers and clients
//! can react without parsing. Replicated writes carry the
//! `x-beacon-replication` header and are applied without re-announcing to
//! the local replicator.

use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use beacon_registry::WriteOutcome;
use beacon_transport::{
    BatchResponse, DeltaResponse, FullRegistryResponse, RegisterRequest, ReplicationInstruction,
    StatusUpdateRequest, WriteAck, REPLICATION_HEADER,
};
use beacon_types::{InstanceId, InstanceRecord};
use serde::Serialize;
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(daemon_status))
        .route("/v1/apps", get(fetch_full))
        .route("/v1/apps/delta", get(fetch_delta))
        .route("/v1/apps/:app", get(fetch_app))
        .route("/v1/apps/:app", post(register))
        .route("/v1/apps/:app/:id", delete(cancel))
        .route("/v1/apps/:app/:id/renew", put(renew))
        .route("/v1/apps/:app/:id/status", put(status_update))
        .route("/v1/vips/:vip", get(fetch_vip))
        .route("/v1/regions/:region", get(fetch_region))
        .route("/v1/replication/batch", post(replication_batch))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn is_replication(headers: &HeaderMap) -> bool {
    headers
        .get(REPLICATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn ack_response(outcome: WriteOutcome) -> (StatusCode, Json<WriteAck>) {
    let ack = WriteAck::from(outcome);
    let code = match ack {
        WriteAck::Applied => StatusCode::OK,
        WriteAck::NotFound => StatusCode::NOT_FOUND,
        WriteAck::Stale => StatusCode::CONFLICT,
    };
    (code, Json(ack))
}

/// Register an instance under an application
async fn register(
    State(state): State<AppState>,
    Path(app): Path<String>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<WriteAck>), StatusCode> {
    if request.record.app_name != app {
        return Err(StatusCode::BAD_REQUEST);
    }
    let outcome = state.registry.register(
        request.record,
        request.lease_duration_secs,
        is_replication(&headers),
    );
    Ok(ack_response(outcome))
}

/// Renew an instance lease
async fn renew(
    State(state): State<AppState>,
    Path((app, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> (StatusCode, Json<WriteAck>) {
    let outcome = state
        .registry
        .renew(&app, &InstanceId::new(id), is_replication(&headers));
    ack_response(outcome)
}

/// Remove an instance lease
async fn cancel(
    State(state): State<AppState>,
    Path((app, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> (StatusCode, Json<WriteAck>) {
    let outcome = state
        .registry
        .cancel(&app, &InstanceId::new(id), is_replication(&headers));
    ack_response(outcome)
}

/// Update an instance's status
async fn status_update(
    State(state): State<AppState>,
    Path((app, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(request): Json<StatusUpdateRequest>,
) -> (StatusCode, Json<WriteAck>) {
    let outcome = state.registry.status_update(
        &app,
        &InstanceId::new(id),
        request.status,
        request.dirty_timestamp,
        is_replication(&headers),
    );
    ack_response(outcome)
}

/// Full registry snapshot, served from the response cache
async fn fetch_full(State(state): State<AppState>) -> Json<FullRegistryResponse> {
    let view = state.cache.full().await;
    Json(FullRegistryResponse {
        applications: (*view.applications).clone(),
        checksum: view.checksum,
    })
}

/// Retained change window plus the checksum of the current full state
async fn fetch_delta(State(state): State<AppState>) -> Json<DeltaResponse> {
    let view = state.cache.delta().await;
    Json(DeltaResponse {
        entries: view.entries,
        checksum: view.checksum,
    })
}

/// Instances of one application; empty list for unknown applications
async fn fetch_app(
    State(state): State<AppState>,
    Path(app): Path<String>,
) -> Json<Vec<InstanceRecord>> {
    let view = state.cache.full().await;
    Json(view.applications.get(&app).to_vec())
}

/// Instances advertising a vip address
async fn fetch_vip(
    State(state): State<AppState>,
    Path(vip): Path<String>,
) -> Json<Vec<InstanceRecord>> {
    let view = state.cache.full().await;
    Json(
        view.applications
            .instances_by_vip(&vip)
            .into_iter()
            .cloned()
            .collect(),
    )
}

/// Instances registered in a region
async fn fetch_region(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> Json<Vec<InstanceRecord>> {
    let view = state.cache.full().await;
    Json(
        view.applications
            .instances_by_region(&region)
            .into_iter()
            .cloned()
            .collect(),
    )
}

/// Apply a batch of replicated mutations in order
async fn replication_batch(
    State(state): State<AppState>,
    Json(batch): Json<Vec<ReplicationInstruction>>,
) -> Json<BatchResponse> {
    let mut acks = Vec::with_capacity(batch.len());
    for instruction in batch {
        let outcome = match instruction {
            ReplicationInstruction::Register {
                record,
                lease_duration_secs,
            } => state.registry.register(record, lease_duration_secs, true),
            ReplicationInstruction::Renew {
                app_name,
                instance_id,
            } => state.registry.renew(&app_name, &instance_id, true),
            ReplicationInstruction::Cancel {
                app_name,
                instance_id,
            } => state.registry.cancel(&app_name, &instance_id, true),
            ReplicationInstruction::StatusUpdate { record } => state.registry.status_update(
                &record.app_name,
                &record.instance_id,
                record.status,
                record.dirty_timestamp,
                true,
            ),
        };
        acks.push(outcome.into());
    }
    Json(BatchResponse { acks })
}

/// Liveness probe
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Daemon status summary
#[derive(Debug, Serialize)]
pub struct DaemonStatusResponse {
    pub version: String,
    pub uptime_secs: i64,
    pub registered_instances: usize,
    pub renewal_threshold: u64,
    pub self_preservation_active: bool,
    pub checksum: String,
}

async fn daemon_status(State(state): State<AppState>) -> Json<DaemonStatusResponse> {
    let view = state.cache.full().await;
    Json(DaemonStatusResponse {
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        registered_instances: state.registry.registered_count(),
        renewal_threshold: state.registry.self_preservation_threshold(),
        self_preservation_active: state.registry.is_below_renewal_threshold(),
        checksum: view.checksum,
    })
}
