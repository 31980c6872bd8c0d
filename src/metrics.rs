//! Prometheus metrics for request latency and store health.
//!
//! This module provides metrics for:
//! - HTTP request latency per endpoint
//! - Numbers inserted
//! - Store failures per operation
//! - Background health check failures

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Numbers inserted counter metric name.
pub const METRIC_NUMBERS_INSERTED: &str = "numbers_inserted_total";
/// Store errors counter metric name.
pub const METRIC_STORE_ERRORS: &str = "store_errors_total";
/// Health check failures counter metric name.
pub const METRIC_HEALTH_CHECK_FAILURES: &str = "db_health_check_failures_total";

/// Install the global Prometheus recorder and register metric descriptions.
///
/// Call this once at startup; a second call fails because the recorder is
/// process-wide.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Initialize all metric descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );
    describe_counter!(
        METRIC_NUMBERS_INSERTED,
        "Total number of values stored"
    );
    describe_counter!(
        METRIC_STORE_ERRORS,
        "Total number of failed store operations"
    );
    describe_counter!(
        METRIC_HEALTH_CHECK_FAILURES,
        "Total number of failed background database pings"
    );

    debug!("Metrics initialized");
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, endpoint: &'static str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint).record(latency_ms);
}

/// Increment numbers inserted counter.
pub fn inc_numbers_inserted() {
    counter!(METRIC_NUMBERS_INSERTED).increment(1);
}

/// Increment store error counter for `operation` (`insert`, `list`).
pub fn inc_store_errors(operation: &'static str) {
    counter!(METRIC_STORE_ERRORS, "operation" => operation).increment(1);
}

/// Increment health check failure counter.
pub fn inc_health_check_failures() {
    counter!(METRIC_HEALTH_CHECK_FAILURES).increment(1);
}

/// RAII guard for timing requests.
/// Records latency for its endpoint when dropped, including when the request
/// future is cancelled.
pub struct LatencyTimer {
    start: Instant,
    endpoint: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given endpoint.
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            start: Instant::now(),
            endpoint,
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_http_latency(self.start, self.endpoint);
    }
}

/// Create a latency timer for the numbers endpoint.
pub fn timer_add_number() -> LatencyTimer {
    LatencyTimer::new("add_number")
}
