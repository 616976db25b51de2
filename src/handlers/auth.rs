use crate::core::error::ServiceError;
use crate::core::state::AppState;
use crate::models::requests::{
    AuthResponse, AuthStatus, CardKeyRequest, ExitRequest, SuccessResponse,
};
use crate::services::admission::AdmissionOutcome;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Check a card in
///
/// POST /std/auth  {"card_key": <n>}
///
/// 200 admitted, 403 denied, 404 unknown card
#[instrument(skip_all)]
pub async fn auth_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CardKeyRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let Json(request) = payload.map_err(|e| ServiceError::InvalidInput(e.body_text()))?;
    debug!(card_key = request.card_key, "Processing check-in");

    let (status, body) = match state.admission.authenticate(request.card_key)? {
        AdmissionOutcome::Admitted(_) => (
            StatusCode::OK,
            AuthResponse {
                status: AuthStatus::Admitted,
                reason: None,
            },
        ),
        AdmissionOutcome::Denied { reason, .. } => (
            StatusCode::FORBIDDEN,
            AuthResponse {
                status: AuthStatus::Denied,
                reason: Some(reason.as_str().to_string()),
            },
        ),
        AdmissionOutcome::NotFound => (
            StatusCode::NOT_FOUND,
            AuthResponse {
                status: AuthStatus::NotFound,
                reason: None,
            },
        ),
    };

    Ok((status, Json(body)).into_response())
}

/// Log an exit
///
/// POST /std/exit  optional body {"card_key": <n>}
pub async fn exit_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ServiceError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ExitRequest::default()
    } else {
        serde_json::from_slice::<ExitRequest>(&body)
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?
    };

    state.admission.record_exit(request.card_key);

    Ok((
        StatusCode::OK,
        Json(SuccessResponse {
            success: true,
            message: "Exit recorded".to_string(),
        }),
    )
        .into_response())
}
