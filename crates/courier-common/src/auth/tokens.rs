//! JWT token service
//!
//! Issues and verifies the access/refresh token pair using the `jsonwebtoken`
//! crate. Access and refresh tokens are signed with separate secrets, so
//! compromise of one does not defeat the other. Verification returns
//! `Option` rather than `Result`: an invalid token is an expected outcome
//! the caller branches on, not an error to propagate.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::AppError;

/// Token type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User email
    pub email: String,
    /// Username
    pub username: String,
    /// Token type (access or refresh)
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Refresh-token id, present on refresh tokens only. Used purely for
    /// server-side revocation tracking, not as secret material.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_id: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Get the user ID as a Uuid
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    /// Check if this is an access token
    #[must_use]
    pub fn is_access_token(&self) -> bool {
        self.token_type == TokenType::Access
    }

    /// Check if this is a refresh token
    #[must_use]
    pub fn is_refresh_token(&self) -> bool {
        self.token_type == TokenType::Refresh
    }
}

/// The identity a token is issued for
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
}

impl From<&courier_core::User> for TokenSubject {
    fn from(user: &courier_core::User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
        }
    }
}

/// Token pair containing access and refresh tokens
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// The id embedded in `refresh_token`, to be persisted on the user record
    pub refresh_token_id: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Generate a refresh-token identifier: 256 bits from the OS RNG,
/// base64url-encoded.
#[must_use]
pub fn generate_refresh_token_id() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// JWT service for issuing and verifying tokens
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    leeway: u64,
}

impl TokenService {
    /// Create a new token service from JWT configuration
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_token_expiry: config.access_token_expiry,
            refresh_token_expiry: config.refresh_token_expiry,
            leeway: config.leeway,
        }
    }

    /// Access token lifetime in seconds
    #[must_use]
    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    /// Issue a signed access token (15 minutes by default)
    pub fn issue_access_token(&self, subject: &TokenSubject) -> Result<String, AppError> {
        self.encode_token(subject, TokenType::Access, None, &self.access_encoding)
    }

    /// Issue a signed refresh token (7 days by default) embedding the given
    /// refresh-token id
    pub fn issue_refresh_token(
        &self,
        subject: &TokenSubject,
        refresh_token_id: &str,
    ) -> Result<String, AppError> {
        self.encode_token(
            subject,
            TokenType::Refresh,
            Some(refresh_token_id.to_string()),
            &self.refresh_encoding,
        )
    }

    /// Issue an access+refresh pair with a freshly generated refresh-token id
    pub fn issue_pair(&self, subject: &TokenSubject) -> Result<TokenPair, AppError> {
        self.issue_pair_with_id(subject, generate_refresh_token_id())
    }

    /// Issue an access+refresh pair bound to a caller-provided refresh-token
    /// id (used by the refresh flow, where the id is rotated into the user's
    /// persisted set before the tokens are minted)
    pub fn issue_pair_with_id(
        &self,
        subject: &TokenSubject,
        refresh_token_id: String,
    ) -> Result<TokenPair, AppError> {
        let access_token = self.issue_access_token(subject)?;
        let refresh_token = self.issue_refresh_token(subject, &refresh_token_id)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            refresh_token_id,
            expires_in: self.access_token_expiry,
        })
    }

    fn encode_token(
        &self,
        subject: &TokenSubject,
        token_type: TokenType,
        refresh_token_id: Option<String>,
        key: &EncodingKey,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let expiry = match token_type {
            TokenType::Access => self.access_token_expiry,
            TokenType::Refresh => self.refresh_token_expiry,
        };

        let claims = Claims {
            sub: subject.user_id.to_string(),
            email: subject.email.clone(),
            username: subject.username.clone(),
            token_type,
            refresh_token_id,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(expiry)).timestamp(),
        };

        encode(&Header::default(), &claims, key)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to encode JWT")))
    }

    /// Verify an access token. Returns `None` on any failure: bad signature,
    /// expiry, malformed token, or a refresh token presented as access.
    #[must_use]
    pub fn verify_access_token(&self, token: &str) -> Option<Claims> {
        let claims = self.decode_token(token, &self.access_decoding)?;
        claims.is_access_token().then_some(claims)
    }

    /// Verify a refresh token. Returns `None` on any failure, including a
    /// missing embedded refresh-token id or an access token presented as
    /// refresh.
    #[must_use]
    pub fn verify_refresh_token(&self, token: &str) -> Option<Claims> {
        let claims = self.decode_token(token, &self.refresh_decoding)?;
        (claims.is_refresh_token() && claims.refresh_token_id.is_some()).then_some(claims)
    }

    fn decode_token(&self, token: &str, key: &DecodingKey) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.leeway = self.leeway;

        decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .ok()
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            access_secret: "test-access-secret-that-is-long-enough".to_string(),
            refresh_secret: "test-refresh-secret-that-is-long-enough".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604_800,
            leeway: 0,
        }
    }

    fn test_subject() -> TokenSubject {
        TokenSubject {
            user_id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            username: "testuser".to_string(),
        }
    }

    #[test]
    fn test_issue_pair() {
        let service = TokenService::new(&test_config());
        let pair = service.issue_pair(&test_subject()).unwrap();

        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
        assert!(!pair.refresh_token_id.is_empty());
        assert_eq!(pair.expires_in, 900);
    }

    #[test]
    fn test_verify_access_token() {
        let service = TokenService::new(&test_config());
        let subject = test_subject();
        let pair = service.issue_pair(&subject).unwrap();

        let claims = service.verify_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.user_id(), Some(subject.user_id));
        assert_eq!(claims.email, subject.email);
        assert_eq!(claims.username, subject.username);
        assert!(claims.is_access_token());
        assert!(claims.refresh_token_id.is_none());
    }

    #[test]
    fn test_verify_refresh_token() {
        let service = TokenService::new(&test_config());
        let subject = test_subject();
        let pair = service.issue_pair(&subject).unwrap();

        let claims = service.verify_refresh_token(&pair.refresh_token).unwrap();
        assert!(claims.is_refresh_token());
        assert_eq!(claims.refresh_token_id.as_deref(), Some(pair.refresh_token_id.as_str()));
    }

    #[test]
    fn test_token_type_mismatch_rejected() {
        let service = TokenService::new(&test_config());
        let pair = service.issue_pair(&test_subject()).unwrap();

        // A refresh token never verifies as access, and vice versa.
        assert!(service.verify_access_token(&pair.refresh_token).is_none());
        assert!(service.verify_refresh_token(&pair.access_token).is_none());
    }

    #[test]
    fn test_type_check_independent_of_secret() {
        // Same secret for both types: verification must still reject on the
        // type claim alone.
        let config = JwtConfig {
            refresh_secret: "shared-secret-used-for-both-token-kinds".to_string(),
            access_secret: "shared-secret-used-for-both-token-kinds".to_string(),
            ..test_config()
        };
        let service = TokenService::new(&config);
        let pair = service.issue_pair(&test_subject()).unwrap();

        assert!(service.verify_access_token(&pair.refresh_token).is_none());
        assert!(service.verify_refresh_token(&pair.access_token).is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = test_config();
        let service = TokenService::new(&config);
        let subject = test_subject();

        // Hand-craft a token that expired 10 seconds ago.
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.user_id.to_string(),
            email: subject.email.clone(),
            username: subject.username.clone(),
            token_type: TokenType::Access,
            refresh_token_id: None,
            iat: now - 910,
            exp: now - 10,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.access_secret.as_bytes()),
        )
        .unwrap();

        assert!(service.verify_access_token(&token).is_none());
    }

    #[test]
    fn test_leeway_tolerates_small_skew() {
        let config = JwtConfig { leeway: 30, ..test_config() };
        let service = TokenService::new(&config);
        let subject = test_subject();

        // Expired 10 seconds ago, within the 30-second leeway.
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.user_id.to_string(),
            email: subject.email.clone(),
            username: subject.username.clone(),
            token_type: TokenType::Access,
            refresh_token_id: None,
            iat: now - 910,
            exp: now - 10,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.access_secret.as_bytes()),
        )
        .unwrap();

        assert!(service.verify_access_token(&token).is_some());
    }

    #[test]
    fn test_malformed_token_rejected() {
        let service = TokenService::new(&test_config());
        assert!(service.verify_access_token("not.a.jwt").is_none());
        assert!(service.verify_refresh_token("").is_none());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = TokenService::new(&test_config());
        let other = TokenService::new(&JwtConfig {
            access_secret: "a-completely-different-access-secret".to_string(),
            ..test_config()
        });

        let pair = other.issue_pair(&test_subject()).unwrap();
        assert!(service.verify_access_token(&pair.access_token).is_none());
    }

    #[test]
    fn test_refresh_token_ids_are_unique() {
        let id1 = generate_refresh_token_id();
        let id2 = generate_refresh_token_id();

        assert_ne!(id1, id2);
        // 32 bytes base64url without padding is 43 characters.
        assert_eq!(id1.len(), 43);
    }
}
