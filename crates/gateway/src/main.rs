//! Dispatch API Gateway
//!
//! HTTP entry point for the dispatch file processor.
//! Handles:
//! - Processor invocations and progress queries
//! - File registration
//! - Rate limiting
//! - Observability (logging, metrics, tracing)

mod app;
mod handlers;
mod middleware;
mod telemetry;

use app::AppState;
use dispatch_common::{
    config::AppConfig,
    db::{DbPool, DispatchStore, Repository},
    metrics,
    storage::{BlobFetcher, StorageClient},
};
use dispatch_processor::{DispatchProcessor, ProcessingSettings};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Arc::new(AppConfig::load()?);

    telemetry::init_tracing(&config.observability);
    info!(
        service = %config.observability.service_name,
        "Starting dispatch gateway v{}",
        dispatch_common::VERSION
    );

    telemetry::init_metrics_exporter(config.observability.metrics_port)?;
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        db.migrate().await?;
    }

    let store: Arc<dyn DispatchStore> = Arc::new(Repository::new(db));
    let blobs: Arc<dyn BlobFetcher> = Arc::new(StorageClient::new(&config.storage)?);
    let processor = Arc::new(DispatchProcessor::new(
        store.clone(),
        blobs,
        ProcessingSettings::from(&config.processing),
    ));

    let state = AppState {
        config: config.clone(),
        store,
        processor,
    };

    let app = app::create_router(state)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let signalled = Arc::new(Notify::new());
    let server = axum::serve(listener, app).with_graceful_shutdown({
        let signalled = signalled.clone();
        async move {
            shutdown_signal().await;
            signalled.notify_one();
        }
    });

    // In-flight requests get the shutdown timeout to drain once signalled
    let drain = config.shutdown_timeout();
    tokio::select! {
        result = server.into_future() => result?,
        _ = async {
            signalled.notified().await;
            tokio::time::sleep(drain).await;
        } => {
            warn!(timeout_secs = drain.as_secs(), "Shutdown timeout reached, dropping open connections");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
