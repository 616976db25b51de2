use crate::core::error::ServiceError;
use axum::http::Uri;

/// JSON 404 for every unmatched route
pub async fn fallback_handler(uri: Uri) -> ServiceError {
    ServiceError::NotFound(format!("No route for {}", uri.path()))
}
