//! Route definitions
//!
//! All API routes organized by domain and mounted under /api.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{auth, chat, health, messages, oauth, users};
use crate::state::AppState;

/// Create the main API router with all routes
pub fn create_router() -> Router<AppState> {
    Router::new()
        .nest("/api", api_routes())
        .merge(health_routes())
}

/// Health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health_check))
}

/// API routes
fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(oauth_routes())
        .merge(chat_routes())
        .merge(message_routes())
        .merge(user_routes())
}

/// Authentication routes
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
}

/// Google OAuth routes
fn oauth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(oauth::google_begin))
        .route("/auth/google/callback", get(oauth::google_callback))
        .route("/auth/google/status", get(oauth::google_status))
}

/// Live chat stream routes
fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chat/events", get(chat::events))
        .route("/chat/active", get(chat::active))
}

/// Message routes
fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/messages/send", post(messages::send))
        .route("/messages/:conversation_id", get(messages::history))
}

/// User routes
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(users::profile))
        .route("/users/search", get(users::search))
        .route("/users/:user_id", get(users::get_user))
}
