//! Spendwatch Service - HTTP API for user spending
//!
//! Opens the SQLite store, confirms it answers, then serves until Ctrl-C.
//! On shutdown the pool is closed after in-flight requests drain.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spendwatch_service::{create_router, AppState, ServiceConfig};
use spendwatch_store::SqliteStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,spendwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_addr = %config.listen_addr,
        database_url = %config.database_url,
        max_connections = config.max_connections,
        request_timeout_seconds = config.request_timeout_seconds,
        "Starting spendwatch"
    );

    // Bootstraps the schema on first use
    let store = Arc::new(SqliteStore::connect(&config.database_url, config.max_connections).await?);
    store.ping().await?;
    tracing::info!("Spending store ready");

    let app = create_router(AppState::new(Arc::clone(&store), config.clone()));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("Spending store closed");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
