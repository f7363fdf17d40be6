//! Prometheus metrics for the execution queue.
//!
//! # Metrics
//!
//! - `queue_jobs_enqueued_total{kind, result}` - enqueue calls, `result` is
//!   `ok` or `duplicate`
//! - `queue_jobs_total{kind, outcome}` - recorded outcomes: `succeeded`,
//!   `retried`, `dead_letter`
//! - `queue_cycle_duration_seconds` - worker cycle wall-clock time

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::domain::work_queue::JobKind;

/// Metrics initialization failure.
#[derive(Debug, thiserror::Error)]
#[error("failed to install metrics exporter: {0}")]
pub struct MetricsError(String);

/// Initialize the Prometheus metrics exporter.
///
/// Starts an HTTP server exposing metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the exporter fails to start (e.g. port already in
/// use).
pub fn init_metrics(listen_addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .install()
        .map_err(|e| MetricsError(e.to_string()))
}

/// Record an enqueue call.
pub fn record_enqueued(kind: JobKind, deduplicated: bool) {
    counter!(
        "queue_jobs_enqueued_total",
        "kind" => kind.as_str(),
        "result" => if deduplicated { "duplicate" } else { "ok" }
    )
    .increment(1);
}

/// Record a work item outcome.
pub fn record_outcome(kind: JobKind, outcome: &'static str) {
    counter!(
        "queue_jobs_total",
        "kind" => kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record the wall-clock duration of one worker cycle.
pub fn record_cycle_duration(elapsed: Duration) {
    histogram!("queue_cycle_duration_seconds").record(elapsed.as_secs_f64());
}
