//! Authentication extractor
//!
//! Extracts and validates the access token, preferring the `access_token`
//! cookie and falling back to an `Authorization: Bearer` header.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use courier_common::AppError;
use uuid::Uuid;

use crate::cookies::ACCESS_TOKEN_COOKIE;
use crate::response::ApiError;
use crate::state::AppState;

/// Authenticated user extracted from a verified access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::App(AppError::MissingAuth))?;

        let token = jar
            .get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .or_else(|| bearer_token(parts))
            .ok_or(ApiError::App(AppError::MissingAuth))?;

        let app_state = AppState::from_ref(state);

        let claims = app_state
            .token_service()
            .verify_access_token(&token)
            .ok_or_else(|| {
                tracing::debug!("Invalid access token presented");
                ApiError::App(AppError::InvalidToken)
            })?;

        let user_id = claims.user_id().ok_or_else(|| {
            tracing::warn!("Access token with malformed subject");
            ApiError::App(AppError::InvalidToken)
        })?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            username: claims.username,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}
