//! Logging and metrics exporter setup

use dispatch_common::config::ObservabilityConfig;
use dispatch_common::metrics::{LATENCY_BUCKETS, PROCESSING_BUCKETS};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; `RUST_LOG` overrides the configured level
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Serve Prometheus metrics on `port`; 0 disables the exporter
pub fn init_metrics_exporter(port: u16) -> anyhow::Result<()> {
    if port == 0 {
        tracing::info!("Metrics exporter disabled");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Suffix("request_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("chunk_duration_seconds".to_string()),
            PROCESSING_BUCKETS,
        )?
        .install()?;

    tracing::info!(port, "Metrics exporter listening");
    Ok(())
}
