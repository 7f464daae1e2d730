//! Metrics collection and exposition.
//!
//! # Metrics
//! - `clean_shutdown_registered_resources` (gauge): registered resources by kind
//! - `clean_shutdown_passes_total` (counter): stop passes by context, outcome
//! - `clean_shutdown_pass_duration_seconds` (histogram): stop pass latency
//! - `clean_shutdown_await_failures_total` (counter): failed awaits by kind, reason
//! - `clean_shutdown_watchdog_health` (gauge): 1=healthy, 0=unhealthy
//! - `clean_shutdown_exit_hook_installed` (gauge): 1 while the exit hook is installed
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resource::ResourceKind;

/// Install the Prometheus recorder with an HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_registered(kind: ResourceKind, count: usize) {
    metrics::gauge!("clean_shutdown_registered_resources", "kind" => kind.as_str()).set(count as f64);
}

pub fn record_pass(context: &'static str, success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("clean_shutdown_passes_total", "context" => context, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("clean_shutdown_pass_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_await_failure(kind: ResourceKind, reason: &'static str) {
    metrics::counter!(
        "clean_shutdown_await_failures_total",
        "kind" => kind.as_str(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_watchdog_health(name: &str, healthy: bool) {
    metrics::gauge!("clean_shutdown_watchdog_health", "watchdog" => name.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_exit_hook(installed: bool) {
    metrics::gauge!("clean_shutdown_exit_hook_installed").set(if installed { 1.0 } else { 0.0 });
}
