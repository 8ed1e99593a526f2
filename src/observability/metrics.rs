//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): dispatched requests by handler, status
//! - `router_request_duration_seconds` (histogram): dispatch latency by handler
//! - `router_controller_failures_total` (counter): failed or panicked controllers
//!
//! # Design Decisions
//! - Labels use handler names, never raw paths (bounded cardinality)
//! - Unmatched requests are labelled with the synthetic not-found handler

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one dispatched request.
pub fn record_dispatch(handler: &str, status: u16, start: Instant) {
    counter!(
        "router_requests_total",
        "handler" => handler.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("router_request_duration_seconds", "handler" => handler.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a controller or filter that failed instead of producing a result.
pub fn record_controller_failure(handler: &str) {
    counter!("router_controller_failures_total", "handler" => handler.to_string()).increment(1);
}
