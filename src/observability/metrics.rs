//! Metrics collection and exposition.
//!
//! # Metrics
//! - `minimus_requests_total` (counter): requests by method, status, outcome
//! - `minimus_request_duration_seconds` (histogram): dispatch latency by outcome
//!
//! # Design Decisions
//! - Recording is always on; without an installed exporter the `metrics`
//!   macros are no-ops
//! - Labels stay low-cardinality: no paths, only the dispatch outcome,
//!   and methods outside the standard set collapse to `OTHER`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const REQUESTS_TOTAL: &str = "minimus_requests_total";
pub const REQUEST_DURATION: &str = "minimus_request_duration_seconds";

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_counter!(REQUESTS_TOTAL, "Requests dispatched, by method, status and outcome");
            describe_histogram!(REQUEST_DURATION, "Time spent in dispatch, in seconds");
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// Label value for `method`. Clients choose the method string, so anything
/// unknown shares one label.
pub fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "CONNECT" => "CONNECT",
        "OPTIONS" => "OPTIONS",
        "TRACE" => "TRACE",
        "PATCH" => "PATCH",
        _ => "OTHER",
    }
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method_label(method),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(REQUEST_DURATION, "outcome" => outcome).record(start.elapsed().as_secs_f64());
}
