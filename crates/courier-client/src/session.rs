//! Authenticated session with a proactive refresh loop
//!
//! The refresh timer is a cancellable task owned by the session: it fires
//! one minute inside the access-token lifetime and refreshes unconditionally,
//! independent of request failures. On refresh failure the loop cancels
//! itself and the session reads as logged out. Starting the loop while it is
//! already running replaces the timer, never duplicates it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use courier_service::CurrentUserResponse;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::ApiClient;
use crate::error::ClientError;

/// One minute inside the 15-minute access-token lifetime
pub const PROACTIVE_REFRESH_INTERVAL: Duration = Duration::from_secs(14 * 60);

/// An authenticated session
pub struct Session {
    client: Arc<ApiClient>,
    user: CurrentUserResponse,
    authenticated: Arc<AtomicBool>,
    refresh_task: Option<JoinHandle<()>>,
}

impl Session {
    /// Login and establish a session
    pub async fn login(
        client: Arc<ApiClient>,
        email: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        let user = client.login(email, password).await?;
        Ok(Self::from_user(client, user))
    }

    /// Register and establish a session
    pub async fn register(
        client: Arc<ApiClient>,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        let user = client.register(username, email, password).await?;
        Ok(Self::from_user(client, user))
    }

    fn from_user(client: Arc<ApiClient>, user: CurrentUserResponse) -> Self {
        Self {
            client,
            user,
            authenticated: Arc::new(AtomicBool::new(true)),
            refresh_task: None,
        }
    }

    /// The logged-in user
    pub fn user(&self) -> &CurrentUserResponse {
        &self.user
    }

    /// The client carrying this session's cookies
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Whether the session is still authenticated (turns false when the
    /// proactive refresh loop hits a failure)
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    /// Start the proactive refresh loop at the default 14-minute interval
    pub fn start_proactive_refresh(&mut self) {
        self.start_proactive_refresh_with(PROACTIVE_REFRESH_INTERVAL);
    }

    /// Start the proactive refresh loop with a custom interval. Idempotent:
    /// an already-running timer is replaced, not duplicated.
    pub fn start_proactive_refresh_with(&mut self, interval: Duration) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }

        let client = Arc::clone(&self.client);
        let authenticated = Arc::clone(&self.authenticated);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the session already holds
            // fresh tokens at this point.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match client.refresh().await {
                    Ok(_) => {
                        tracing::debug!("Proactive token refresh succeeded");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Proactive token refresh failed, ending session");
                        authenticated.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
        });

        self.refresh_task = Some(handle);
    }

    /// Whether the proactive refresh loop is currently running
    pub fn refresh_loop_running(&self) -> bool {
        self.refresh_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the proactive refresh loop without logging out
    pub fn stop_proactive_refresh(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
    }

    /// Logout: cancel the refresh loop, revoke the refresh token, clear state
    pub async fn logout(mut self) -> Result<(), ClientError> {
        self.stop_proactive_refresh();
        self.authenticated.store(false, Ordering::SeqCst);
        self.client.logout().await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Session teardown deterministically cancels the timer.
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user.id)
            .field("authenticated", &self.is_authenticated())
            .field("refresh_loop_running", &self.refresh_loop_running())
            .finish()
    }
}
