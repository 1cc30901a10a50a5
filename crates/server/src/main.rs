//! waypost server entry point.
//!
//! Boots the cache layer in front of the configured origin: install and
//! activate run before the listener accepts connections.
//! Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use waypost_client::{Backends, FetchClient, FetchConfig};
use waypost_core::{AppConfig, CacheDb};

mod app;
mod error;
mod handler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, listen = %config.listen_addr, "Starting waypost");

    let store = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let app = app::App::from_config(&config, Backends::new(Arc::new(store), Arc::new(network)))?;

    app.start().await?;
    tracing::info!(phase = ?app.lifecycle().phase(), "cache layer ready");

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, handler::router(app.dispatcher(), config.max_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
