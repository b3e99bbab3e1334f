//! User entity - represents a chat user account

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// User entity
///
/// `password_hash` is `None` for accounts created through Google OAuth that
/// never set a password. `refresh_tokens` holds the identifiers of all
/// currently-valid refresh tokens; a refresh token is usable only while its
/// identifier is in this set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
    pub google_id: Option<String>,
    pub is_google_user: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub refresh_tokens: Vec<String>,
}

impl User {
    /// Create a new password-based user
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash: Some(password_hash),
            first_name: None,
            last_name: None,
            avatar: None,
            google_id: None,
            is_google_user: false,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login: None,
            refresh_tokens: Vec::new(),
        }
    }

    /// Create a new user from a Google account (no password)
    pub fn new_google(username: String, email: String, google_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash: None,
            first_name: None,
            last_name: None,
            avatar: None,
            google_id: Some(google_id),
            is_google_user: true,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login: None,
            refresh_tokens: Vec::new(),
        }
    }

    /// Check if this account can authenticate with a password
    #[inline]
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Check if the given refresh-token id is currently valid for this user
    #[inline]
    pub fn has_refresh_token(&self, token_id: &str) -> bool {
        self.refresh_tokens.iter().any(|t| t == token_id)
    }

    /// Display name: "First Last" when both are set, otherwise the username
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            _ => self.username.clone(),
        }
    }
}
