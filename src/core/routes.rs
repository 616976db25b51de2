// HTTP routes configuration

use crate::core::config::ServerConfig;
use crate::core::state::AppState;
use crate::handlers::{auth, fallback, health, logs, metrics, users};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);

    Router::new()
        // Check-in
        .route("/std/auth", post(auth::auth_handler))
        .route("/std/exit", post(auth::exit_handler))

        // User directory
        .route(
            "/std/user",
            get(users::list_users_handler).post(users::create_user_handler),
        )
        .route("/std/user/{card_key}", get(users::get_user_handler))
        .route("/std/user/update/{id}", put(users::update_user_handler))
        .route("/std/user/deactivate/{id}", put(users::deactivate_user_handler))
        .route("/std/user/activate/{id}", put(users::activate_user_handler))
        .route("/std/user/blocked/{id}", put(users::block_user_handler))
        .route("/std/user/unblocked/{id}", put(users::unblock_user_handler))

        // Audit trail
        .route("/std/logs", get(logs::list_logs_handler))
        .route("/std/logs/{user_id}", get(logs::user_logs_handler))

        // Operations
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))

        // 404 fallback for all unmatched routes
        .fallback(fallback::fallback_handler)

        .layer(cors)
        .with_state(state)
}

/// `"*"` allows any origin, anything else is matched exactly
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origin = match config.cors_allow_origin.as_str() {
        "*" => AllowOrigin::any(),
        exact => match HeaderValue::from_str(exact) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!(origin = exact, "Invalid CORS origin, allowing any origin");
                AllowOrigin::any()
            }
        },
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::POST,
            Method::GET,
            Method::PUT,
            Method::OPTIONS,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE])
}
