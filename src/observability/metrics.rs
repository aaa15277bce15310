//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): total requests by method, status, backend
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_active_connections` (gauge): in-flight requests per backend
//! - `proxy_backend_health` (gauge): 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Low-overhead updates through the `metrics` facade; with no recorder
//!   installed (tests) every call is a no-op
//! - The exporter listens on its own address, separate from the proxy surface

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Failure to install is logged, not fatal: the balancer keeps serving
/// without metrics.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }

    metrics::describe_counter!(
        "proxy_requests_total",
        "Total proxied requests by method, status, and backend"
    );
    metrics::describe_histogram!(
        "proxy_request_duration_seconds",
        "End-to-end request latency in seconds"
    );
    metrics::describe_gauge!(
        "proxy_active_connections",
        "Requests currently in flight per backend"
    );
    metrics::describe_gauge!(
        "proxy_backend_health",
        "Backend health: 1 healthy, 0 unhealthy"
    );
}

/// Record one proxied request.
pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("backend", backend.to_string()),
    ];
    metrics::counter!("proxy_requests_total", &labels).increment(1);
    metrics::histogram!("proxy_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record a backend's probed health state.
pub fn record_backend_health(backend: &str, healthy: bool) {
    metrics::gauge!("proxy_backend_health", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

/// Record a backend's active-connection count as observed by its probe.
pub fn record_backend_load(backend: &str, active: usize) {
    metrics::gauge!("proxy_active_connections", "backend" => backend.to_string())
        .set(active as f64);
}
