//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by outcome and reason
//! - `relay_request_duration_seconds` (histogram): latency distribution
//! - `relay_upstream_healthy` (gauge): 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - The degraded reason label distinguishes failure causes that are
//!   invisible in the HTTP response itself

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_counter!(
                "relay_requests_total",
                "Total relay requests by outcome and degraded reason"
            );
            describe_histogram!(
                "relay_request_duration_seconds",
                "Relay latency distribution by outcome"
            );
            describe_gauge!(
                "relay_upstream_healthy",
                "Upstream health (1=healthy, 0=unhealthy)"
            );
            tracing::info!(address = %addr, "Metrics exporter started");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics exporter");
        }
    }
}

/// Record one completed relay request.
pub fn record_relay(outcome: &'static str, reason: &'static str, start: Instant) {
    counter!("relay_requests_total", "outcome" => outcome, "reason" => reason).increment(1);
    histogram!("relay_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record the upstream health gauge.
pub fn record_upstream_health(healthy: bool) {
    gauge!("relay_upstream_healthy").set(if healthy { 1.0 } else { 0.0 });
}
