//! Calendar events API server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use events_api::shutdown::shutdown_signal;
use events_api::{router, AppState};
use shared::{Config, ConnectionManager, MssqlStore};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        host = %config.database.address.host,
        database = %config.database.database,
        tenant_context = config.tenant_id.is_some(),
        "Configuration loaded"
    );

    let connections = Arc::new(ConnectionManager::new(config.database.clone()));
    let store = Arc::new(MssqlStore::new(connections.clone()));
    let app = router(AppState::new(store, &config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API on http://localhost:{}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    connections.close().await;
    Ok(())
}
