//! Request counters and Prometheus exposition.
//!
//! Installs a Prometheus recorder behind the `metrics` facade; the
//! returned handle renders the text exposition served (admin-only) at
//! `/admin/metrics`. In tests the recorder is cached because a process
//! may install it only once.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
#[cfg(test)]
use std::sync::OnceLock;

#[cfg(test)]
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus metrics recorder.
#[cfg(not(test))]
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))
}

/// Install (or reuse) the Prometheus metrics recorder in tests.
#[cfg(test)]
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = METRICS_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("metrics recorder")
    });
    Ok(handle.clone())
}

/// Count one computation request.
pub fn record_request(operation: &'static str) {
    metrics::counter!("compute_requests_total", "operation" => operation).increment(1);
}

/// Count a cache hit or miss for an operation.
pub fn record_cache(operation: &'static str, hit: bool) {
    if hit {
        metrics::counter!("compute_cache_hits_total", "operation" => operation).increment(1);
    } else {
        metrics::counter!("compute_cache_misses_total", "operation" => operation).increment(1);
    }
}

/// Count a login attempt by outcome.
pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("auth_logins_total", "outcome" => outcome).increment(1);
}
