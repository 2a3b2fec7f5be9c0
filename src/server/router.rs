use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{health, query, sessions};
use crate::state::AppState;

/// Uploads (PDFs, images) can be large; the axum default is too tight.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Creates the main application router with all routes and middleware.
///
/// CORS is permissive: the backend serves a separate browser frontend.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/query", post(query::query))
        .route("/sessions", get(sessions::list_sessions))
        .route("/history/:session_id", get(sessions::get_history))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}
