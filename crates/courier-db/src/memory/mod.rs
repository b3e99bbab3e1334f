//! In-memory repository implementations
//!
//! Behave like the PostgreSQL repositories but store everything in process
//! memory. Used by unit and integration tests, and for running the server
//! locally without a database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use courier_core::entities::{Message, User};
use courier_core::error::DomainError;
use courier_core::traits::{MessageRepository, RepoResult, UserRepository};

/// In-memory implementation of UserRepository
#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserRepository {
    /// Create a new empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Whether the repository is empty
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.users.read().get(&id).filter(|u| u.is_active).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.email == email && u.is_active)
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        Ok(self.users.read().values().any(|u| u.email == email))
    }

    async fn username_exists(&self, username: &str) -> RepoResult<bool> {
        Ok(self.users.read().values().any(|u| u.username == username))
    }

    async fn create(&self, user: &User) -> RepoResult<()> {
        let mut users = self.users.write();

        if users.values().any(|u| u.email == user.email) {
            return Err(DomainError::EmailAlreadyExists);
        }
        if users.values().any(|u| u.username == user.username) {
            return Err(DomainError::UsernameAlreadyExists);
        }

        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn record_login(&self, id: Uuid, refresh_token_id: &str) -> RepoResult<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(&id)
            .filter(|u| u.is_active)
            .ok_or(DomainError::UserNotFound(id))?;

        user.last_login = Some(chrono::Utc::now());
        user.updated_at = chrono::Utc::now();
        user.refresh_tokens.push(refresh_token_id.to_string());
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        old_id: &str,
        new_id: &str,
    ) -> RepoResult<Option<User>> {
        let mut users = self.users.write();
        let Some(user) = users.get_mut(&id).filter(|u| u.is_active) else {
            return Ok(None);
        };

        // Compare-and-swap under one lock, mirroring the single-statement
        // update the PostgreSQL repository performs.
        let Some(pos) = user.refresh_tokens.iter().position(|t| t == old_id) else {
            return Ok(None);
        };
        user.refresh_tokens.remove(pos);
        user.refresh_tokens.push(new_id.to_string());
        user.updated_at = chrono::Utc::now();

        Ok(Some(user.clone()))
    }

    async fn remove_refresh_token(&self, id: Uuid, refresh_token_id: &str) -> RepoResult<()> {
        let mut users = self.users.write();
        if let Some(user) = users.get_mut(&id) {
            user.refresh_tokens.retain(|t| t != refresh_token_id);
            user.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn link_google_account(
        &self,
        id: Uuid,
        google_id: &str,
        avatar: Option<&str>,
    ) -> RepoResult<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(&id)
            .filter(|u| u.is_active)
            .ok_or(DomainError::UserNotFound(id))?;

        user.google_id = Some(google_id.to_string());
        user.is_google_user = true;
        if let Some(avatar) = avatar {
            user.avatar = Some(avatar.to_string());
        }
        user.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn search(&self, query: &str, exclude: Uuid, limit: i64) -> RepoResult<Vec<User>> {
        let query = query.to_lowercase();
        let mut matches: Vec<User> = self
            .users
            .read()
            .values()
            .filter(|u| u.is_active && u.id != exclude)
            .filter(|u| {
                u.username.to_lowercase().starts_with(&query)
                    || u.email.to_lowercase().starts_with(&query)
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| a.username.cmp(&b.username));
        matches.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(matches)
    }
}

/// In-memory implementation of MessageRepository
#[derive(Clone, Default)]
pub struct MemoryMessageRepository {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl MemoryMessageRepository {
    /// Create a new empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages
    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    /// Whether the repository is empty
    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn create(&self, message: &Message) -> RepoResult<()> {
        self.messages.write().push(message.clone());
        Ok(())
    }

    async fn find_by_conversation(
        &self,
        conversation_id: &str,
        limit: i64,
    ) -> RepoResult<Vec<Message>> {
        let limit = limit.clamp(1, 100);
        let mut matches: Vec<Message> = self
            .messages
            .read()
            .iter()
            .filter(|m| m.conversation_id == conversation_id && !m.is_deleted)
            .cloned()
            .collect();

        // Newest first, capped, like the SQL query.
        matches.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        matches.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(matches)
    }
}
