use crate::core::error::ServiceError;
use crate::core::state::AppState;
use crate::validation::payload::parse_event_user_id;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

/// All events, newest first
///
/// GET /std/logs
pub async fn list_logs_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ServiceError> {
    let events = state.audit.list_events()?;
    Ok((StatusCode::OK, Json(events)).into_response())
}

/// Events of one user; `0` lists events without user context
///
/// GET /std/logs/{user_id}
pub async fn user_logs_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Response, ServiceError> {
    let user_id = parse_event_user_id(&user_id)?;
    let events = state.audit.list_events_for_user(user_id)?;
    Ok((StatusCode::OK, Json(events)).into_response())
}
