//! # courier-api
//!
//! The HTTP server: REST endpoints for auth and messaging plus the SSE
//! delivery stream, built on Axum.

pub mod cookies;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, create_app_state, run, run_server};
pub use state::AppState;
