//! Authentication handlers
//!
//! Endpoints for user registration, login, logout, and token refresh.
//! Tokens are carried in HTTP-only cookies; response bodies carry the
//! profile only.

use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use courier_common::AppError;
use courier_service::{AuthResponse, AuthService, LoginRequest, RegisterRequest};

use crate::cookies::{clear_auth_cookies, set_auth_cookies, REFRESH_TOKEN_COOKIE};
use crate::extractors::ValidatedJson;
use crate::response::{ApiResult, Created, NoContent};
use crate::state::AppState;

/// Register a new user
///
/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<(CookieJar, Created<Json<AuthResponse>>)> {
    let service = AuthService::new(state.service_context());
    let session = service.register(request).await?;

    let jar = set_auth_cookies(jar, &session.tokens, state.secure_cookies());
    Ok((jar, Created(Json(AuthResponse { user: session.user }))))
}

/// Login with email and password
///
/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let service = AuthService::new(state.service_context());
    let session = service.login(request).await?;

    let jar = set_auth_cookies(jar, &session.tokens, state.secure_cookies());
    Ok((jar, Json(AuthResponse { user: session.user })))
}

/// Rotate the token pair using the refresh cookie
///
/// POST /api/refresh
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let refresh_token = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AppError::MissingAuth)?;

    let service = AuthService::new(state.service_context());
    let session = service.refresh(&refresh_token).await?;

    let jar = set_auth_cookies(jar, &session.tokens, state.secure_cookies());
    Ok((jar, Json(AuthResponse { user: session.user })))
}

/// Logout: revoke the presented refresh-token id and clear cookies.
/// Best-effort; succeeds even without a valid session.
///
/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, NoContent)> {
    let refresh_token = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string());

    let service = AuthService::new(state.service_context());
    service.logout(refresh_token.as_deref()).await?;

    let jar = clear_auth_cookies(jar, state.secure_cookies());
    Ok((jar, NoContent))
}
