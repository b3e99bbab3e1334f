//! # courier-client
//!
//! Client library for the Courier API: a cookie-carrying HTTP client with
//! the single-shot 401 refresh-and-retry, a session object owning the
//! proactive token-refresh timer, and an SSE event consumer.

pub mod api;
pub mod error;
pub mod events;
pub mod session;

pub use api::ApiClient;
pub use error::ClientError;
pub use events::EventStream;
pub use session::{Session, PROACTIVE_REFRESH_INTERVAL};
