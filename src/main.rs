use axum::{http::HeaderValue, Router};
use std::panic;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use policy_collab::auth;
use policy_collab::clients;
use policy_collab::config::{self, Config};
use policy_collab::db::memstore::MemStore;
use policy_collab::db::store::{CollabStore, PgStore};
use policy_collab::docs::ApiDoc;
use policy_collab::routes::api::{create_api_routes, create_ws_routes};
use policy_collab::services::comment_service::CommentService;
use policy_collab::services::version_service::VersionService;
use policy_collab::ws::registry::ConnectionRegistry;
use policy_collab::ws::session::SessionHub;
use policy_collab::AppState;

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "policy_collab=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    config::set_config(config.clone());

    // Initialize caches and the application backend client
    auth::principals::init_prpl_cache();
    match (&config.app_service_url, &config.auth_jwt_secret) {
        (Some(url), Some(secret)) => {
            if let Err(e) = clients::app_client::init_app_client(
                url.clone(),
                secret.clone(),
                config.service_name.clone(),
            ) {
                error!("Failed to initialize app client: {}", e);
            }
        }
        _ => warn!(
            "No app service URL configured - role lookups and mention notifications are disabled"
        ),
    }

    // Initialize the store: Postgres when configured, in-memory otherwise
    let store: Arc<dyn CollabStore> = match &config.db_url {
        Some(db_url) => match PgStore::new(db_url).await {
            Ok(store) => {
                info!("Database initialized successfully");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Falling back to the in-memory store");
                Arc::new(MemStore::new())
            }
        },
        None => {
            warn!("No database URL configured - using the in-memory store");
            Arc::new(MemStore::new())
        }
    };

    // Wire up the collaboration core
    let registry = Arc::new(ConnectionRegistry::new());
    let versions = VersionService::new(store.clone());
    let comments = CommentService::new(store.clone());
    let hub = SessionHub::new(registry, store, versions.clone());
    let app_state = Arc::new(AppState {
        hub,
        comments,
        versions,
    });

    // CORS: restrict to the configured origins, allow everything otherwise
    let cors = match config.cors_origins.as_deref() {
        Some(origins) if origins != "*" => {
            let origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        _ => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    // Combine all routes
    let app_routes = Router::new()
        // Mount API routes
        .nest("/api", create_api_routes(app_state.clone()))
        // Mount the WebSocket endpoint
        .nest("/ws", create_ws_routes(app_state.clone()))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing and CORS layers
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start the HTTP server
    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 WebSocket available at ws://{}/ws", config.server_address());
    info!(
        "📚 Swagger UI available at http://{}/swagger",
        config.server_address()
    );

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
