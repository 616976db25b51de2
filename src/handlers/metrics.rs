// Metrics endpoint

use crate::core::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

/// Returns JSON with the admission counters, recorder outcomes, table sizes
/// and uptime.
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state
        .metrics
        .get_snapshot(state.users.as_ref(), state.events.as_ref());

    (StatusCode::OK, Json(snapshot)).into_response()
}
