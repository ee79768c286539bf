use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    Json,
};
use georep_executor::{commands, ClusterStatus, GeoReplicationRequest};
use std::sync::Arc;
use tracing::info;

use super::{georep_error, inventory_error, ApiError, AppState};
use crate::{
    db::execute_async,
    services::inventory,
    types::{GeoReplicationVolume, GeoReplicationVolumeStatus},
};

fn status_location(volume_id: &str) -> String {
    format!("/volumes/{}/georeplication", volume_id)
}

/// POST /volumes/:id/georeplication - Queue a geo-replication action
///
/// The request is checked before it is queued, so a missing slave or an
/// unsupported create option is answered with 400 and nothing runs.
pub async fn volume_action(
    State(state): State<Arc<AppState>>,
    Path(volume_id): Path<String>,
    Json(req): Json<GeoReplicationRequest>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1]), ApiError> {
    let id = volume_id.clone();
    let (volume, host) = execute_async(&state.db, move |conn| {
        inventory::resolve_volume_host(conn, &id)
    })
    .await
    .map_err(inventory_error)?;

    commands::for_request(&volume.name, &req).map_err(georep_error)?;

    info!(
        "Queueing geo-replication {} for volume {} on {}",
        req.action, volume.name, host
    );

    let sessions = state.sessions.clone();
    let location = status_location(&volume_id);
    let op_id = state
        .operations
        .spawn(async move {
            sessions.action(&host, &volume.name, &req).await?;
            Ok(location)
        })
        .await;
    info!(
        "Queued operation {} ({} tracked)",
        op_id,
        state.operations.tracked().await
    );

    Ok((
        StatusCode::ACCEPTED,
        [(header::LOCATION, format!("/queue/{}", op_id))],
    ))
}

/// GET /volumes/:id/georeplication - Sessions of one master volume
pub async fn volume_status(
    State(state): State<Arc<AppState>>,
    Path(volume_id): Path<String>,
) -> Result<Json<GeoReplicationVolumeStatus>, ApiError> {
    let (volume, host) = execute_async(&state.db, move |conn| {
        inventory::resolve_volume_host(conn, &volume_id)
    })
    .await
    .map_err(inventory_error)?;

    let sessions = state
        .sessions
        .volume_status(&host, &volume.name)
        .await
        .map_err(georep_error)?;

    Ok(Json(GeoReplicationVolumeStatus {
        volume: GeoReplicationVolume {
            name: volume.name,
            sessions,
        },
    }))
}

/// GET /clusters/:id/georeplication - Every session the cluster knows
pub async fn cluster_status(
    State(state): State<Arc<AppState>>,
    Path(cluster_id): Path<String>,
) -> Result<Json<ClusterStatus>, ApiError> {
    let host = execute_async(&state.db, move |conn| {
        inventory::cluster_manage_host(conn, &cluster_id)
    })
    .await
    .map_err(inventory_error)?;

    let status = state
        .sessions
        .global_status(&host)
        .await
        .map_err(georep_error)?;

    Ok(Json(status))
}
