use crate::core::error::ServiceError;
use crate::core::state::AppState;
use crate::models::requests::{CreateUserRequest, ListUsersQuery, UpdateUserRequest};
use crate::validation::payload::{parse_card_key, parse_user_id};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

fn json_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ServiceError::InvalidInput(e.body_text()))
}

/// List users
///
/// GET /std/user[?include_inactive=true]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Response, ServiceError> {
    let Query(params) = params.map_err(|e| ServiceError::InvalidInput(e.body_text()))?;
    let users = state.directory.list_users(!params.include_inactive)?;
    Ok((StatusCode::OK, Json(users)).into_response())
}

/// GET /std/user/{card_key}
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(card_key): Path<String>,
) -> Result<Response, ServiceError> {
    let card_key = parse_card_key(&card_key)?;
    let user = state.directory.get_user_by_card_key(card_key)?;
    Ok((StatusCode::OK, Json(user)).into_response())
}

/// POST /std/user
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let request = json_payload(payload)?;
    let user = state.directory.create_user(request)?;
    Ok((StatusCode::OK, Json(user)).into_response())
}

/// PUT /std/user/update/{id}
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let id = parse_user_id(&id)?;
    let request = json_payload(payload)?;
    let user = state.directory.update_user(id, request)?;
    Ok((StatusCode::OK, Json(user)).into_response())
}

/// PUT /std/user/deactivate/{id}
pub async fn deactivate_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let user = state.directory.set_active(parse_user_id(&id)?, false)?;
    Ok((StatusCode::OK, Json(user)).into_response())
}

/// PUT /std/user/activate/{id}
pub async fn activate_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let user = state.directory.set_active(parse_user_id(&id)?, true)?;
    Ok((StatusCode::OK, Json(user)).into_response())
}

/// PUT /std/user/blocked/{id}
pub async fn block_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let user = state.directory.set_status(parse_user_id(&id)?, false)?;
    Ok((StatusCode::OK, Json(user)).into_response())
}

/// PUT /std/user/unblocked/{id}
pub async fn unblock_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let user = state.directory.set_status(parse_user_id(&id)?, true)?;
    Ok((StatusCode::OK, Json(user)).into_response())
}
