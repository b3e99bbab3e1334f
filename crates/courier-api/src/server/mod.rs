//! Server setup and initialization
//!
//! Provides the main application builder and server runner.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use courier_common::{AppConfig, AppError, TokenService};
use courier_db::{create_pool, PgMessageRepository, PgUserRepository};
use courier_realtime::ConnectionRegistry;
use courier_service::{GoogleOAuthClient, ServiceContext};
use tokio::net::TcpListener;
use tracing::info;

use crate::middleware::apply_middleware;
use crate::routes::create_router;
use crate::state::AppState;

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let router = create_router();
    let router = apply_middleware(router, &state.config().cors);
    router.with_state(state)
}

/// Initialize all dependencies and create AppState
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    // Create database pool
    info!("Connecting to PostgreSQL...");
    let db_config = courier_db::DatabaseConfig::from(&config.database);
    let pool = create_pool(&db_config)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    info!("PostgreSQL connection established");

    // Token service: signing-key misconfiguration is fatal here, not per-call
    let token_service = Arc::new(TokenService::new(&config.jwt));

    // Connection registry (single shared instance for the whole process)
    let registry = ConnectionRegistry::new_shared();

    // Google OAuth client, if configured
    let google = GoogleOAuthClient::from_config(&config.google).map(Arc::new);
    if google.is_none() {
        info!("Google OAuth credentials not found, Sign-in with Google is disabled");
    }

    // Repositories
    let user_repo = Arc::new(PgUserRepository::new(pool.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(pool));

    let service_context =
        ServiceContext::new(user_repo, message_repo, token_service, registry, google);

    Ok(AppState::new(service_context, config))
}

/// Run the HTTP server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    // Create app state
    let state = create_app_state(config).await?;

    // Build application
    let app = create_app(state);

    // Run server
    run_server(app, addr).await
}
