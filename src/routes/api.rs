use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::{
    create_comment, create_snapshot, diagnostics, diff_versions, health_check, list_comments,
    list_versions, rollback_version, update_comment,
};
use crate::routes::auth_middleware::auth_middleware;
use crate::websocket::handler::websocket_handler;
use crate::AppState;

/// Create API routes
pub fn create_api_routes(app_state: Arc<AppState>) -> Router {
    Router::<Arc<AppState>>::new()
        .route("/v1/diagnostics", get(diagnostics))
        .route(
            "/v1/documents/:document_id/versions",
            get(list_versions).post(create_snapshot),
        )
        .route("/v1/documents/:document_id/versions/diff", get(diff_versions))
        .route(
            "/v1/documents/:document_id/versions/rollback",
            post(rollback_version),
        )
        .route(
            "/v1/documents/:document_id/comments",
            get(list_comments).post(create_comment),
        )
        .route("/v1/comments/:comment_id", patch(update_comment))
        .route_layer(middleware::from_fn(auth_middleware)) // Applies to all routes added above
        // Liveness probe stays unauthenticated
        .route("/health", get(health_check))
        .with_state(app_state)
}

/// Create the WebSocket route, behind the same auth middleware
pub fn create_ws_routes(app_state: Arc<AppState>) -> Router {
    Router::<Arc<AppState>>::new()
        .route("/:document_id", get(websocket_handler))
        .route_layer(middleware::from_fn(auth_middleware))
        .with_state(app_state)
}
