//! Prometheus metrics exposition
//!
//! The worker crate emits through the `metrics` facade; this module installs
//! the process-wide Prometheus recorder so `/metrics` can render them.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Must run before the worker is spawned so its first cycle is recorded.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a request to an admin endpoint by route and response status.
pub fn record_admin_request(route: &'static str, status: u16) {
    metrics::counter!(
        "cookie_refresher_admin_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
}
