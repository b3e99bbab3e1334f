//! Google OAuth client
//!
//! Builds the consent URL, exchanges the authorization code for tokens, and
//! fetches the user's Google profile. Provider failures surface as
//! `UPSTREAM_UNAVAILABLE` and are never retried here.

use courier_common::GoogleConfig;
use reqwest::Url;
use serde::Deserialize;
use tracing::instrument;

use super::error::{ServiceError, ServiceResult};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const GOOGLE_SCOPES: &str =
    "https://www.googleapis.com/auth/userinfo.email https://www.googleapis.com/auth/userinfo.profile";

/// Profile fields returned by Google's userinfo endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
    pub verified_email: Option<bool>,
}

/// Google OAuth client. Constructed only when a client id/secret pair is
/// configured.
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleOAuthClient {
    /// Build a client from configuration; `None` when OAuth is not configured
    pub fn from_config(config: &GoogleConfig) -> Option<Self> {
        let client_id = config.client_id.clone()?;
        let client_secret = config.client_secret.clone()?;

        Some(Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    /// The consent-screen URL the client is redirected to
    pub fn authorize_url(&self, state: &str) -> String {
        let mut url = Url::parse(GOOGLE_AUTH_URL).expect("static auth url");
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", GOOGLE_SCOPES)
            .append_pair("access_type", "offline")
            .append_pair("include_granted_scopes", "true")
            .append_pair("prompt", "consent")
            .append_pair("state", state);
        url.into()
    }

    /// Exchange an authorization code for a Google access token
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> ServiceResult<String> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| ServiceError::upstream(format!("Google token endpoint: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(status = %status, "Google code exchange failed");
            return Err(ServiceError::upstream(format!(
                "Google token endpoint returned {status}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::upstream(format!("Google token response: {e}")))?;

        Ok(token.access_token)
    }

    /// Fetch the profile of the user the access token belongs to
    #[instrument(skip(self, access_token))]
    pub async fn fetch_user(&self, access_token: &str) -> ServiceResult<GoogleUserInfo> {
        let response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ServiceError::upstream(format!("Google userinfo endpoint: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(status = %status, "Google userinfo fetch failed");
            return Err(ServiceError::upstream(format!(
                "Google userinfo endpoint returned {status}"
            )));
        }

        response
            .json::<GoogleUserInfo>()
            .await
            .map_err(|e| ServiceError::upstream(format!("Google userinfo response: {e}")))
    }
}

impl std::fmt::Debug for GoogleOAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOAuthClient")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}
