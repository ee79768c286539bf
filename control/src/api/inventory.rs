use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

use super::{inventory_error, ApiError, AppState};
use crate::{
    db::execute_async,
    services::inventory,
    types::{
        AddNodeRequest, Cluster, CreateVolumeRequest, ListClustersResponse, ListVolumesResponse,
        Node, Volume,
    },
};

/// POST /clusters - Create an empty cluster
pub async fn create_cluster(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<Cluster>), ApiError> {
    let cluster = execute_async(&state.db, |conn| inventory::create_cluster(conn))
        .await
        .map_err(inventory_error)?;

    info!("Cluster created: cluster_id={}", cluster.cluster_id);
    Ok((StatusCode::CREATED, Json(cluster)))
}

/// GET /clusters - List all clusters
pub async fn list_clusters(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListClustersResponse>, ApiError> {
    let clusters = execute_async(&state.db, |conn| inventory::list_clusters(conn))
        .await
        .map_err(inventory_error)?;

    Ok(Json(ListClustersResponse { clusters }))
}

/// POST /nodes - Register a node in a cluster
pub async fn add_node(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddNodeRequest>,
) -> Result<(StatusCode, Json<Node>), ApiError> {
    if req.manage_hostname.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "manage_hostname must not be empty".to_string(),
        ));
    }

    info!(
        "Adding node: cluster_id={}, manage_hostname={}",
        req.cluster_id, req.manage_hostname
    );

    let storage_hostname = req
        .storage_hostname
        .clone()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| req.manage_hostname.clone());

    let node = execute_async(&state.db, move |conn| {
        inventory::add_node(
            conn,
            &req.cluster_id,
            &req.manage_hostname,
            &storage_hostname,
        )
    })
    .await
    .map_err(inventory_error)?;

    info!("Node added: node_id={}", node.node_id);
    Ok((StatusCode::CREATED, Json(node)))
}

/// POST /volumes - Record a gluster volume
pub async fn create_volume(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateVolumeRequest>,
) -> Result<(StatusCode, Json<Volume>), ApiError> {
    if req.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "name must not be empty".to_string()));
    }

    let volume = execute_async(&state.db, move |conn| {
        inventory::create_volume(conn, &req.name, &req.cluster_id)
    })
    .await
    .map_err(inventory_error)?;

    info!(
        "Volume created: volume_id={}, name={}",
        volume.volume_id, volume.name
    );
    Ok((StatusCode::CREATED, Json(volume)))
}

/// GET /volumes - List all volumes
pub async fn list_volumes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListVolumesResponse>, ApiError> {
    let volumes = execute_async(&state.db, |conn| inventory::list_volumes(conn))
        .await
        .map_err(inventory_error)?;

    Ok(Json(ListVolumesResponse { volumes }))
}
