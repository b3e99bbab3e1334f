//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` for JSON output; field names are
//! camelCase on the wire.

use courier_core::User;
use courier_realtime::MessagePayload;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Auth/User Responses
// ============================================================================

/// Current authenticated user response (includes email)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<&User> for CurrentUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// Public user response (no email)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// Authentication response. Tokens travel in HTTP-only cookies, so the body
/// carries the profile only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: CurrentUserResponse,
}

// ============================================================================
// Chat Responses
// ============================================================================

/// Message history for a conversation, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHistoryResponse {
    pub data: Vec<MessagePayload>,
    pub count: usize,
}

/// Snapshot of currently connected user ids
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUsersResponse {
    pub user_ids: Vec<Uuid>,
}

// ============================================================================
// Misc Responses
// ============================================================================

/// Whether Sign-in with Google is available
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleStatusResponse {
    pub configured: bool,
}

/// Liveness probe response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    #[must_use]
    pub fn healthy() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_user_response_from_user() {
        let mut user = User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "$argon2id$fake".to_string(),
        );
        user.first_name = Some("Alice".to_string());

        let response = CurrentUserResponse::from(&user);
        assert_eq!(response.email, "alice@example.com");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["firstName"], "Alice");
        assert!(json.get("lastName").is_none());
    }

    #[test]
    fn test_public_user_response_has_no_email() {
        let user = User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "$argon2id$fake".to_string(),
        );
        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert!(json.get("email").is_none());
    }
}
