//! Prometheus metrics for the service.
//!
//! Provides counters for cleanup deletions and errors, plus a histogram of
//! cleanup run durations.

#[cfg(feature = "prometheus")]
use std::sync::OnceLock;

#[cfg(feature = "prometheus")]
use metrics::{counter, histogram};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

/// Histogram buckets for cleanup run durations, in seconds. The hard time
/// limit defaults to 30 s, so the upper buckets bracket it.
#[cfg(feature = "prometheus")]
const RUN_DURATION_BUCKETS: &[f64] = &[0.05, 0.25, 1.0, 5.0, 15.0, 30.0, 60.0];

/// Global Prometheus handle for the metrics endpoint.
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics system with the given configuration.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Suffix("_duration_seconds".to_string()),
            RUN_DURATION_BUCKETS,
        )
        .map_err(|e| MetricsError::Setup(e.to_string()))?;

    let handle = builder.install_recorder().map_err(MetricsError::Install)?;

    // Store handle for the metrics endpoint
    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::Setup("Metrics already initialized".to_string()))?;

    Ok(())
}

/// Initialize the metrics system (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(_config: &MetricsConfig) -> Result<(), MetricsError> {
    Ok(())
}

/// Get the Prometheus handle for rendering metrics.
#[cfg(feature = "prometheus")]
pub fn get_prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Record rows deleted by the cleanup worker.
pub fn record_cleanup_deletion(entity: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("cleanup_deletions_total", "entity" => entity.to_string()).increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (entity, count);
    }
}

/// Record a failed cleanup run.
pub fn record_cleanup_error() {
    #[cfg(feature = "prometheus")]
    {
        counter!("cleanup_errors_total").increment(1);
    }
}

/// Record how long a cleanup run took.
pub fn record_cleanup_run_duration(duration: std::time::Duration) {
    #[cfg(feature = "prometheus")]
    {
        histogram!("cleanup_run_duration_seconds").record(duration.as_secs_f64());
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = duration;
    }
}

/// Metrics initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to set up metrics: {0}")]
    Setup(String),

    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}
