//! Calendar events API on AWS Lambda behind API Gateway.

use std::sync::Arc;

use events_api::{router, AppState};
use lambda_http::{run, Error};
use shared::{Config, ConnectionManager, MssqlStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::from_env()?;
    let connections = Arc::new(ConnectionManager::new(config.database.clone()));
    let store = Arc::new(MssqlStore::new(connections));

    run(router(AppState::new(store, &config))).await
}
