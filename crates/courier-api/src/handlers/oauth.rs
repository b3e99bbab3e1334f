//! Google OAuth handlers
//!
//! Begin/callback endpoints for the authorization-code flow. Callback
//! failures redirect back to the sign-in page with an error query parameter
//! instead of surfacing an error status.

use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use courier_common::AppError;
use courier_service::{AuthService, GoogleStatusResponse};
use serde::Deserialize;
use tracing::warn;

use crate::cookies::set_auth_cookies;
use crate::response::ApiResult;
use crate::state::AppState;

/// Where a successful OAuth login lands
const OAUTH_SUCCESS_REDIRECT: &str = "/chat";

/// Query parameters Google sends to the callback
#[derive(Debug, Deserialize)]
pub struct GoogleCallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub state: Option<String>,
}

fn signin_error(code: &str) -> Redirect {
    Redirect::temporary(&format!("/signin?error={code}"))
}

/// Begin the Google OAuth flow
///
/// GET /api/auth/google
pub async fn google_begin(State(state): State<AppState>) -> ApiResult<Redirect> {
    let google = state
        .service_context()
        .google()
        .ok_or_else(|| AppError::upstream("Google OAuth is not configured"))?;

    let flow = "signin";
    Ok(Redirect::temporary(&google.authorize_url(flow)))
}

/// OAuth callback: exchange the code, find-or-create the user, set cookies
///
/// GET /api/auth/google/callback
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<GoogleCallbackParams>,
) -> (CookieJar, Redirect) {
    if let Some(error) = params.error {
        warn!(error = %error, "Google OAuth returned an error");
        return (jar, signin_error("oauth_error"));
    }

    let Some(code) = params.code else {
        warn!("Google OAuth callback without authorization code");
        return (jar, signin_error("missing_code"));
    };

    let Some(google) = state.service_context().google() else {
        return (jar, signin_error("oauth_unconfigured"));
    };

    let access_token = match google.exchange_code(&code).await {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "Google code exchange failed");
            return (jar, signin_error("token_error"));
        }
    };

    let google_user = match google.fetch_user(&access_token).await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "Google userinfo fetch failed");
            return (jar, signin_error("user_error"));
        }
    };

    let service = AuthService::new(state.service_context());
    match service.login_with_google(google_user).await {
        Ok(session) => {
            let jar = set_auth_cookies(jar, &session.tokens, state.secure_cookies());
            (jar, Redirect::temporary(OAUTH_SUCCESS_REDIRECT))
        }
        Err(e) => {
            warn!(error = %e, "Google sign-in failed");
            (jar, signin_error("user_error"))
        }
    }
}

/// Whether Sign-in with Google is available
///
/// GET /api/auth/google/status
pub async fn google_status(State(state): State<AppState>) -> Json<GoogleStatusResponse> {
    Json(GoogleStatusResponse {
        configured: state.service_context().google().is_some(),
    })
}
