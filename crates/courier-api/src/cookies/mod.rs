//! Session cookie management
//!
//! The token pair travels in HTTP-only cookies: `access_token` (15 minutes)
//! and `refresh_token` (7 days), SameSite=Strict, path `/`, `Secure` in
//! production.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use courier_common::TokenPair;
use time::Duration;

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Access cookie lifetime (seconds)
pub const ACCESS_TOKEN_MAX_AGE: i64 = 900;

/// Refresh cookie lifetime (seconds)
pub const REFRESH_TOKEN_MAX_AGE: i64 = 604_800;

fn build_cookie(name: &'static str, value: String, max_age: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(Duration::seconds(max_age))
        .build()
}

/// Set both auth cookies on the jar
pub fn set_auth_cookies(jar: CookieJar, tokens: &TokenPair, secure: bool) -> CookieJar {
    jar.add(build_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        ACCESS_TOKEN_MAX_AGE,
        secure,
    ))
    .add(build_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        REFRESH_TOKEN_MAX_AGE,
        secure,
    ))
}

/// Clear both auth cookies (empty value, max-age 0)
pub fn clear_auth_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(build_cookie(ACCESS_TOKEN_COOKIE, String::new(), 0, secure))
        .add(build_cookie(REFRESH_TOKEN_COOKIE, String::new(), 0, secure))
}
