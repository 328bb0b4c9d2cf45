#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::task::JoinHandle;

use estate_api::auth::{Principal, Role, TokenCodec};
use estate_api::config::AppConfig;
use estate_api::database::models::{ListingInput, NewListing};
use estate_api::database::{ListingStore, MemoryStore};
use estate_api::{app, serve, AppState};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const ADMIN_USERNAME: &str = "NEadmin";
pub const ADMIN_EMAIL: &str = "admin@nusantara.com";
pub const ADMIN_PASSWORD: &str = "BARA211";

/// A router served on a free local port, backed by its own in-memory store.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub codec: TokenCodec,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = TEST_SECRET.to_string();
    config.api.enable_rate_limiting = false;
    config
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(test_config(), MemoryStore::new()).await
    }

    pub async fn start_with(config: AppConfig, store: MemoryStore) -> Result<Self> {
        init_tracing();

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let store = Arc::new(store);
        let state = AppState::new(store.clone(), &config);
        let codec = state.codec.clone();
        let router = app(state, &config);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind {}", base_url))?;
        let handle = tokio::spawn(async move {
            if let Err(e) = serve(listener, router).await {
                tracing::error!("test server stopped: {}", e);
            }
        });

        let server = Self {
            port,
            base_url,
            store,
            codec,
            client: reqwest::Client::new(),
            handle,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/api/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn admin_token(&self) -> String {
        self.codec.issue(&Principal::bootstrap_admin()).expect("issue admin token")
    }

    pub fn user_token(&self, id: i64) -> String {
        self.codec.issue(&Principal::new(id, Role::User)).expect("issue user token")
    }

    pub async fn insert_listing(&self, body: Value) -> Result<i64> {
        let input: ListingInput = serde_json::from_value(body)?;
        let listing: NewListing = input
            .into_new_listing()
            .map_err(|errors| anyhow::anyhow!("invalid listing fixture: {:?}", errors))?;
        Ok(self.store.create_listing(&listing).await?.id)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub async fn json_body(resp: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = resp.status();
    let body = resp.json::<Value>().await?;
    Ok((status, body))
}
