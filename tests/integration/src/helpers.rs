//! Test helpers for integration tests
//!
//! Spawns the real Axum application on a loopback port with in-memory
//! repositories, so the full HTTP surface (cookies, SSE, refresh rotation)
//! can be driven end-to-end without external services.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use courier_api::{create_app, AppState};
use courier_client::ApiClient;
use courier_common::{
    AppConfig, AppSettings, CorsConfig, DatabaseConfig, Environment, GoogleConfig, JwtConfig,
    ServerConfig, TokenService,
};
use courier_db::{MemoryMessageRepository, MemoryUserRepository};
use courier_realtime::ConnectionRegistry;
use courier_service::ServiceContext;
use reqwest::header::SET_COOKIE;
use reqwest::Response;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Knobs for the test server's token behavior
#[derive(Debug, Clone)]
pub struct TestOptions {
    /// Access token lifetime in seconds
    pub access_token_expiry: i64,
    /// Clock-skew leeway in seconds
    pub leeway: u64,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            access_token_expiry: 900,
            leeway: 0,
        }
    }
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with default options
    pub async fn start() -> Result<Self> {
        Self::start_with(TestOptions::default()).await
    }

    /// Start a test server with custom token options
    pub async fn start_with(options: TestOptions) -> Result<Self> {
        let config = test_config(&options);

        let token_service = Arc::new(TokenService::new(&config.jwt));
        let service_context = ServiceContext::new(
            Arc::new(MemoryUserRepository::new()),
            Arc::new(MemoryMessageRepository::new()),
            token_service,
            ConnectionRegistry::new_shared(),
            None,
        );
        let state = AppState::new(service_context, config);
        let app = create_app(state);

        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A fresh cookie-carrying API client for this server
    pub fn client(&self) -> ApiClient {
        ApiClient::new(self.base_url()).expect("Failed to build API client")
    }

    /// A bare reqwest client without a cookie store, for tests that manage
    /// cookies by hand (token replay, revocation)
    pub fn raw_client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }
}

/// Build the test AppConfig
fn test_config(options: &TestOptions) -> AppConfig {
    AppConfig {
        app: AppSettings {
            name: "courier-test".to_string(),
            env: Environment::Development,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            access_secret: "integration-access-secret-long-enough".to_string(),
            refresh_secret: "integration-refresh-secret-long-enough".to_string(),
            access_token_expiry: options.access_token_expiry,
            refresh_token_expiry: 604_800,
            leeway: options.leeway,
        },
        google: GoogleConfig::default(),
        cors: CorsConfig::default(),
    }
}

/// Extract a cookie value from a response's Set-Cookie headers
pub fn extract_cookie(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|header| {
            header
                .strip_prefix(&prefix)
                .and_then(|rest| rest.split(';').next())
                .map(str::to_string)
        })
}
