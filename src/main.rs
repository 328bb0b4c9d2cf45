use anyhow::Context;
use tracing_subscriber::EnvFilter;

use estate_api::config::{self, Environment};
use estate_api::database::open_store;
use estate_api::{app, is_production, serve, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("estate_api=info,tower_http=info")),
        )
        .init();

    let config = config::config();
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting estate API in {:?} mode", config.environment);

    if is_production!() && config.security.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS_ORIGINS allows any origin in production");
    }
    if config.environment != Environment::Production && config.security.bootstrap_admin.is_some() {
        tracing::info!("Bootstrap admin login is enabled");
    }

    let store = open_store(&config.database).await?;
    let state = AppState::new(store, config);
    let router = app(state, config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Estate API listening on http://{}", bind_addr);
    serve(listener, router).await?;
    Ok(())
}
