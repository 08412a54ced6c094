pub mod auth;
pub mod clients;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod websocket;
pub mod ws;

use std::sync::Arc;

use services::comment_service::CommentService;
use services::version_service::VersionService;
use ws::session::SessionHub;

/// Shared application state
pub struct AppState {
    pub hub: Arc<SessionHub>,
    pub comments: Arc<CommentService>,
    pub versions: Arc<VersionService>,
}
