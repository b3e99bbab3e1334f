//! HTTP API client
//!
//! Carries the auth cookies in a cookie store and implements the transport-
//! layer compensation: a request answered with 401 triggers exactly one
//! refresh attempt followed by exactly one retry; a second 401 is surfaced
//! to the caller as the final result.

use courier_realtime::MessagePayload;
use courier_service::{
    ActiveUsersResponse, AuthResponse, CurrentUserResponse, MessageHistoryResponse,
};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use crate::error::{ClientError, ErrorBody};

/// Cookie-carrying client for the Courier API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given base URL (e.g. `http://127.0.0.1:3000`)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// The underlying reqwest client (shares the cookie store)
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Auth endpoints (no retry: these ARE the compensation path)
    // ========================================================================

    /// Register a new account; auth cookies are stored on success
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<CurrentUserResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/register"))
            .json(&json!({ "username": username, "email": email, "password": password }))
            .send()
            .await?;

        Ok(expect_json::<AuthResponse>(response).await?.user)
    }

    /// Login; auth cookies are stored on success
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<CurrentUserResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        Ok(expect_json::<AuthResponse>(response).await?.user)
    }

    /// Rotate the token pair using the refresh cookie
    pub async fn refresh(&self) -> Result<CurrentUserResponse, ClientError> {
        let response = self.http.post(self.url("/api/refresh")).send().await?;
        Ok(expect_json::<AuthResponse>(response).await?.user)
    }

    /// Logout and drop the session cookies
    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.http.post(self.url("/api/logout")).send().await?;
        expect_ok(response).await
    }

    // ========================================================================
    // Protected endpoints (401 -> refresh -> retry once)
    // ========================================================================

    /// Current user's profile
    pub async fn profile(&self) -> Result<CurrentUserResponse, ClientError> {
        let response = self
            .send_with_refresh(self.http.get(self.url("/api/profile")))
            .await?;
        expect_json(response).await
    }

    /// Send a message
    pub async fn send_message(
        &self,
        conversation_id: &str,
        receiver_id: Uuid,
        content: &str,
    ) -> Result<MessagePayload, ClientError> {
        let request = self.http.post(self.url("/api/messages/send")).json(&json!({
            "conversationId": conversation_id,
            "receiverId": receiver_id,
            "content": content,
        }));

        let response = self.send_with_refresh(request).await?;
        expect_json(response).await
    }

    /// Conversation history, oldest first
    pub async fn history(&self, conversation_id: &str) -> Result<MessageHistoryResponse, ClientError> {
        let response = self
            .send_with_refresh(self.http.get(self.url(&format!("/api/messages/{conversation_id}"))))
            .await?;
        expect_json(response).await
    }

    /// Best-effort snapshot of online user ids
    pub async fn active_users(&self) -> Result<ActiveUsersResponse, ClientError> {
        let response = self
            .send_with_refresh(self.http.get(self.url("/api/chat/active")))
            .await?;
        expect_json(response).await
    }

    /// Send a request; on 401, refresh once and retry once. A second 401 is
    /// the final answer. This is a single-shot compensating action, not a
    /// retry policy.
    async fn send_with_refresh(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let retry = request.try_clone();

        let response = request.send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(retry) = retry else {
            return Ok(response);
        };

        tracing::debug!("Received 401, attempting token refresh");
        let refreshed = self.http.post(self.url("/api/refresh")).send().await?;
        if !refreshed.status().is_success() {
            tracing::debug!(status = %refreshed.status(), "Token refresh failed, surfacing 401");
            return Ok(response);
        }

        Ok(retry.send().await?)
    }
}

/// Parse a success body, or convert the error envelope into `ClientError::Api`
async fn expect_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    Err(api_error(status, response).await)
}

/// Discard a success body, or convert the error envelope
async fn expect_ok(response: Response) -> Result<(), ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(api_error(status, response).await)
}

async fn api_error(status: StatusCode, response: Response) -> ClientError {
    match response.json::<ErrorBody>().await {
        Ok(body) => ClientError::Api {
            status: status.as_u16(),
            code: body.error.code,
            message: body.error.message,
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            code: "UNKNOWN".to_string(),
            message: format!("HTTP {status}"),
        },
    }
}
