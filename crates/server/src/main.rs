//! cove-worker entry point.
//!
//! Boots the asset cache worker against the configured site origin and serves
//! its MCP tools on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use cove_client::{FetchClient, FetchConfig, Worker};
use cove_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        origin = %config.origin,
        db_path = %config.db_path.display(),
        version = %config.cache_version,
        "Starting cove-worker on stdio transport"
    );

    let storage = Arc::new(CacheDb::open(&config.db_path).await?);
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker = Arc::new(Worker::from_config(&config, storage, network)?);

    match worker.start().await {
        Ok(purged) => tracing::info!(purged = purged.len(), "worker active"),
        Err(e) => tracing::error!(error = %e, "worker not active; requests pass through to the network"),
    }

    let handler = handler::CoveServer::new(Arc::clone(&worker));
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    let settled = worker.settle().await;
    tracing::debug!(settled, "background refreshes settled");

    Ok(())
}
