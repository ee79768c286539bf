pub mod georep;
pub mod inventory;
pub mod operations;

use axum::{http::StatusCode, routing::get, routing::post, Json, Router};
use georep_executor::{GeoRepError, SessionManager};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::db::DbPool;
use crate::services::{LookupError, OperationManager};
use crate::types::HealthResponse;

pub struct AppState {
    pub db: DbPool,
    pub sessions: SessionManager,
    pub operations: OperationManager,
}

pub type ApiError = (StatusCode, String);

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Inventory
        .route(
            "/clusters",
            post(inventory::create_cluster).get(inventory::list_clusters),
        )
        .route("/nodes", post(inventory::add_node))
        .route(
            "/volumes",
            post(inventory::create_volume).get(inventory::list_volumes),
        )
        // Geo-replication
        .route(
            "/volumes/:id/georeplication",
            post(georep::volume_action).get(georep::volume_status),
        )
        .route("/clusters/:id/georeplication", get(georep::cluster_status))
        // Async operations
        .route("/queue/:id", get(operations::poll_operation))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Health check endpoint
async fn health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Missing records are 404, everything else a server error
pub fn inventory_error(e: anyhow::Error) -> ApiError {
    let status = if e.downcast_ref::<LookupError>().is_some() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, format!("{:#}", e))
}

pub fn georep_error(e: GeoRepError) -> ApiError {
    let status = if e.is_precondition() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, e.to_string())
}
