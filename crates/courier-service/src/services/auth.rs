//! Authentication service
//!
//! Handles user registration, login, token refresh/rotation, logout, and
//! Google OAuth sign-in.

use courier_common::auth::{
    generate_refresh_token_id, hash_password, validate_password_strength, verify_password,
};
use courier_common::{AppError, TokenPair, TokenSubject};
use courier_core::entities::User;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::dto::{CurrentUserResponse, LoginRequest, RegisterRequest};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::oauth::GoogleUserInfo;

/// The outcome of a successful authentication: the token pair to place in
/// cookies plus the profile to return in the body.
#[derive(Debug)]
pub struct AuthSession {
    pub tokens: TokenPair,
    pub user: CurrentUserResponse,
}

/// Authentication service
pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Register a new user
    #[instrument(skip(self, request), fields(username = %request.username, email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<AuthSession> {
        validate_password_strength(&request.password).map_err(ServiceError::from)?;

        if self.ctx.user_repo().email_exists(&request.email).await? {
            return Err(ServiceError::conflict("Email already registered"));
        }
        if self.ctx.user_repo().username_exists(&request.username).await? {
            return Err(ServiceError::conflict("Username already taken"));
        }

        let password_hash =
            hash_password(&request.password).map_err(|e| ServiceError::internal(e.to_string()))?;

        let mut user = User::new(request.username, request.email, password_hash);

        // Mint the pair first so the user row is created with its refresh-token
        // id already in the set: registration is a single write.
        let tokens = self
            .ctx
            .token_service()
            .issue_pair(&TokenSubject::from(&user))
            .map_err(ServiceError::from)?;
        user.refresh_tokens.push(tokens.refresh_token_id.clone());
        user.last_login = Some(chrono::Utc::now());

        self.ctx.user_repo().create(&user).await?;

        info!(user_id = %user.id, "User registered successfully");

        Ok(AuthSession {
            user: CurrentUserResponse::from(&user),
            tokens,
        })
    }

    /// Login with email and password
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<AuthSession> {
        let user = self
            .ctx
            .user_repo()
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| {
                warn!(email = %request.email, "Login failed: user not found");
                ServiceError::App(AppError::InvalidCredentials)
            })?;

        // OAuth-only accounts have no password hash.
        let password_hash = user.password_hash.as_deref().ok_or_else(|| {
            warn!(user_id = %user.id, "Login failed: no password hash");
            ServiceError::App(AppError::InvalidCredentials)
        })?;

        let is_valid = verify_password(&request.password, password_hash)
            .map_err(|e| ServiceError::internal(e.to_string()))?;

        if !is_valid {
            warn!(user_id = %user.id, "Login failed: invalid password");
            return Err(ServiceError::App(AppError::InvalidCredentials));
        }

        info!(user_id = %user.id, "User logged in successfully");

        self.establish_session(&user).await
    }

    /// Rotate tokens using a refresh token.
    ///
    /// The presented refresh-token id is consumed and replaced with a fresh
    /// one in a single atomic repository operation; presenting an id that was
    /// already rotated away fails even while the token's signature and expiry
    /// are still valid.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<AuthSession> {
        let claims = self
            .ctx
            .token_service()
            .verify_refresh_token(refresh_token)
            .ok_or(ServiceError::App(AppError::InvalidToken))?;

        let user_id = claims
            .user_id()
            .ok_or(ServiceError::App(AppError::InvalidToken))?;
        let old_id = claims
            .refresh_token_id
            .ok_or(ServiceError::App(AppError::InvalidToken))?;

        let new_id = generate_refresh_token_id();
        let user = self
            .ctx
            .user_repo()
            .rotate_refresh_token(user_id, &old_id, &new_id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %user_id, "Refresh failed: token id revoked or already rotated");
                ServiceError::App(AppError::RevokedToken)
            })?;

        let tokens = self
            .ctx
            .token_service()
            .issue_pair_with_id(&TokenSubject::from(&user), new_id)
            .map_err(ServiceError::from)?;

        info!(user_id = %user.id, "Tokens refreshed successfully");

        Ok(AuthSession {
            user: CurrentUserResponse::from(&user),
            tokens,
        })
    }

    /// Logout: revoke the refresh-token id presented in the cookie.
    ///
    /// Best-effort by design: an invalid or absent token still results in a
    /// successful logout (the handler clears cookies regardless).
    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, refresh_token: Option<&str>) -> ServiceResult<()> {
        let Some(token) = refresh_token else {
            return Ok(());
        };

        let Some(claims) = self.ctx.token_service().verify_refresh_token(token) else {
            return Ok(());
        };

        if let (Some(user_id), Some(token_id)) = (claims.user_id(), claims.refresh_token_id) {
            if let Err(e) = self
                .ctx
                .user_repo()
                .remove_refresh_token(user_id, &token_id)
                .await
            {
                warn!(user_id = %user_id, error = %e, "Failed to revoke refresh token on logout");
            } else {
                info!(user_id = %user_id, "User logged out successfully");
            }
        }

        Ok(())
    }

    /// Sign in with a verified Google account: find the user by email, link
    /// the Google id to an existing account, or create a new passwordless
    /// account.
    #[instrument(skip(self, google_user), fields(email = %google_user.email))]
    pub async fn login_with_google(&self, google_user: GoogleUserInfo) -> ServiceResult<AuthSession> {
        let user = match self.ctx.user_repo().find_by_email(&google_user.email).await? {
            Some(existing) => {
                if !existing.is_google_user {
                    self.ctx
                        .user_repo()
                        .link_google_account(
                            existing.id,
                            &google_user.id,
                            google_user.picture.as_deref(),
                        )
                        .await?;
                    info!(user_id = %existing.id, "Google account linked to existing user");
                }
                // Re-read so the session reflects the linked profile.
                self.ctx
                    .user_repo()
                    .find_by_id(existing.id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("User", existing.id.to_string()))?
            }
            None => {
                let mut user = User::new_google(
                    google_username(&google_user.email),
                    google_user.email.clone(),
                    google_user.id.clone(),
                );
                user.first_name = google_user.given_name.clone();
                user.last_name = google_user.family_name.clone();
                user.avatar = google_user.picture.clone();

                self.ctx.user_repo().create(&user).await?;
                info!(user_id = %user.id, "User created from Google account");
                user
            }
        };

        self.establish_session(&user).await
    }

    /// Issue a token pair and append its refresh-token id to the user's set
    async fn establish_session(&self, user: &User) -> ServiceResult<AuthSession> {
        let tokens = self
            .ctx
            .token_service()
            .issue_pair(&TokenSubject::from(user))
            .map_err(ServiceError::from)?;

        self.ctx
            .user_repo()
            .record_login(user.id, &tokens.refresh_token_id)
            .await?;

        Ok(AuthSession {
            user: CurrentUserResponse::from(user),
            tokens,
        })
    }
}

/// Username for a new Google user: email local part plus a random suffix
fn google_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or("user");
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(char::from)
        .collect();
    format!("{}_{}", local, suffix.to_lowercase())
}
