use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::AppState;
use crate::services::OperationState;

pub const PENDING_HEADER: &str = "x-pending";

/// GET /queue/:id - Poll a queued operation
pub async fn poll_operation(
    State(state): State<Arc<AppState>>,
    Path(op_id): Path<String>,
) -> Response {
    match state.operations.poll(&op_id).await {
        None => (
            StatusCode::NOT_FOUND,
            format!("Operation not found: {}", op_id),
        )
            .into_response(),
        Some(OperationState::Pending) => {
            (StatusCode::OK, [(PENDING_HEADER, "true")]).into_response()
        }
        Some(OperationState::Done { location }) => {
            (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
        }
        Some(OperationState::Failed { error }) => {
            (StatusCode::INTERNAL_SERVER_ERROR, error).into_response()
        }
    }
}
