//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all dispatch metrics
pub const METRICS_PREFIX: &str = "dispatch";

/// Histogram buckets for HTTP request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Buckets for chunk processing, bounded by the 45s invocation budget
pub const PROCESSING_BUCKETS: &[f64] = &[
    0.100,  // 100ms
    0.500,  // 500ms
    1.000,  // 1s
    5.000,  // 5s
    10.00,  // 10s
    20.00,  // 20s
    30.00,  // 30s
    45.00,  // budget
    60.00,  // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Processing metrics
    describe_counter!(
        format!("{}_chunks_processed_total", METRICS_PREFIX),
        Unit::Count,
        "Processor invocations by file type and status"
    );

    describe_histogram!(
        format!("{}_chunk_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Chunk processing latency in seconds"
    );

    describe_counter!(
        format!("{}_pods_extracted_total", METRICS_PREFIX),
        Unit::Count,
        "Distinct POD codes extracted per chunk"
    );

    describe_counter!(
        format!("{}_entries_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Archive entries skipped because they could not be read"
    );

    describe_counter!(
        format!("{}_deadline_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Invocations that stopped at the processing deadline"
    );

    describe_counter!(
        format!("{}_size_gate_skips_total", METRICS_PREFIX),
        Unit::Count,
        "Files not downloaded because they exceed the size gate"
    );

    describe_counter!(
        format!("{}_download_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Files that could not be downloaded from storage"
    );

    describe_counter!(
        format!("{}_chunk_replays_total", METRICS_PREFIX),
        Unit::Count,
        "Invocations answered from an already completed chunk row"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Summary of one processor invocation for metrics
#[derive(Debug, Clone, Copy)]
pub struct ChunkReport<'a> {
    pub file_type: &'a str,
    pub status: &'a str,
    pub duration_secs: f64,
    pub pods: usize,
    pub entries_skipped: usize,
    pub timed_out: bool,
}

/// Helper to record chunk processing metrics
pub fn record_chunk(report: ChunkReport<'_>) {
    counter!(
        format!("{}_chunks_processed_total", METRICS_PREFIX),
        "file_type" => report.file_type.to_string(),
        "status" => report.status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_chunk_duration_seconds", METRICS_PREFIX),
        "file_type" => report.file_type.to_string()
    )
    .record(report.duration_secs);

    counter!(
        format!("{}_pods_extracted_total", METRICS_PREFIX),
        "file_type" => report.file_type.to_string()
    )
    .increment(report.pods as u64);

    if report.entries_skipped > 0 {
        counter!(format!("{}_entries_skipped_total", METRICS_PREFIX))
            .increment(report.entries_skipped as u64);
    }

    if report.timed_out {
        counter!(
            format!("{}_deadline_hits_total", METRICS_PREFIX),
            "file_type" => report.file_type.to_string()
        )
        .increment(1);
    }
}

/// Helper to record a size-gate skip
pub fn record_size_gate_skip(file_type: &str) {
    counter!(
        format!("{}_size_gate_skips_total", METRICS_PREFIX),
        "file_type" => file_type.to_string()
    )
    .increment(1);
}

/// Helper to record a failed download
pub fn record_download_failure(file_type: &str) {
    counter!(
        format!("{}_download_failures_total", METRICS_PREFIX),
        "file_type" => file_type.to_string()
    )
    .increment(1);
}

/// Helper to record an idempotent replay
pub fn record_replay(file_type: &str) {
    counter!(
        format!("{}_chunk_replays_total", METRICS_PREFIX),
        "file_type" => file_type.to_string()
    )
    .increment(1);
}
