//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation (PostgreSQL in production, in-memory for
//! tests and local development).

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{Message, User};
use crate::error::DomainError;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;

    /// Find user by email
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    /// Check if email is already taken
    async fn email_exists(&self, email: &str) -> RepoResult<bool>;

    /// Check if username is already taken
    async fn username_exists(&self, username: &str) -> RepoResult<bool>;

    /// Create a new user
    async fn create(&self, user: &User) -> RepoResult<()>;

    /// Record a successful login: set `last_login` and append a fresh
    /// refresh-token id to the user's set
    async fn record_login(&self, id: Uuid, refresh_token_id: &str) -> RepoResult<()>;

    /// Atomically consume `old_id` and insert `new_id` in the user's
    /// refresh-token set.
    ///
    /// Returns the updated user, or `None` when `old_id` is not in the set
    /// (already rotated away or revoked). Implementations must perform the
    /// membership check and the swap as one operation; there is no window in
    /// which the set holds neither id.
    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        old_id: &str,
        new_id: &str,
    ) -> RepoResult<Option<User>>;

    /// Remove a refresh-token id from the user's set (logout / revocation).
    /// Removing an absent id is a no-op.
    async fn remove_refresh_token(&self, id: Uuid, refresh_token_id: &str) -> RepoResult<()>;

    /// Link a Google account to an existing user
    async fn link_google_account(
        &self,
        id: Uuid,
        google_id: &str,
        avatar: Option<&str>,
    ) -> RepoResult<()>;

    /// Search users by username or email prefix, excluding one user id
    async fn search(&self, query: &str, exclude: Uuid, limit: i64) -> RepoResult<Vec<User>>;
}

// ============================================================================
// Message Repository
// ============================================================================

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a new message
    async fn create(&self, message: &Message) -> RepoResult<()>;

    /// Fetch the most recent messages of a conversation, newest first,
    /// capped at `limit`. Soft-deleted messages are excluded.
    async fn find_by_conversation(
        &self,
        conversation_id: &str,
        limit: i64,
    ) -> RepoResult<Vec<Message>>;
}
