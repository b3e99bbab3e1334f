//! Service context - dependency container for services
//!
//! Holds the repositories, token service, connection registry, and the
//! optional Google OAuth client. Constructed once at startup and shared by
//! all request handlers; tests build one around in-memory repositories.

use std::sync::Arc;

use courier_common::TokenService;
use courier_core::traits::{MessageRepository, UserRepository};
use courier_realtime::ConnectionRegistry;

use super::oauth::GoogleOAuthClient;

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    user_repo: Arc<dyn UserRepository>,
    message_repo: Arc<dyn MessageRepository>,
    token_service: Arc<TokenService>,
    registry: Arc<ConnectionRegistry>,
    google: Option<Arc<GoogleOAuthClient>>,
}

impl ServiceContext {
    /// Create a new service context
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        message_repo: Arc<dyn MessageRepository>,
        token_service: Arc<TokenService>,
        registry: Arc<ConnectionRegistry>,
        google: Option<Arc<GoogleOAuthClient>>,
    ) -> Self {
        Self {
            user_repo,
            message_repo,
            token_service,
            registry,
            google,
        }
    }

    /// Get the user repository
    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    /// Get the message repository
    pub fn message_repo(&self) -> &dyn MessageRepository {
        self.message_repo.as_ref()
    }

    /// Get the token service
    pub fn token_service(&self) -> &TokenService {
        &self.token_service
    }

    /// Get the connection registry
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Get the shared connection registry handle
    pub fn registry_handle(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Get the Google OAuth client, if configured
    pub fn google(&self) -> Option<&GoogleOAuthClient> {
        self.google.as_deref()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("registry", &self.registry)
            .field("google_configured", &self.google.is_some())
            .finish_non_exhaustive()
    }
}
