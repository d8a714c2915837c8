//! Prometheus metrics infrastructure

use std::sync::Arc;

use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;

/// Handle for rendering the current metrics snapshot
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Metrics in the Prometheus text exposition format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
///
/// Installs a recorder without an HTTP listener; callers render snapshots
/// themselves.
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            register_default_metrics();
            tracing::debug!("Prometheus metrics recorder installed");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

fn register_default_metrics() {
    describe_counter!("matcher_requests_total", "Match requests received");
    describe_counter!("matcher_outcomes_total", "Completed match requests by outcome");
    describe_counter!("matcher_cache_hits_total", "Similarity cache hits");
    describe_counter!("matcher_cache_misses_total", "Similarity cache misses by reason");
    describe_counter!("matcher_rate_limited_total", "Requests denied by the rate limiter");
    describe_counter!("matcher_retry_attempts_total", "Retries scheduled after a transient failure");
    describe_counter!("matcher_retries_exhausted_total", "Operations that ran out of attempts");
    describe_counter!("matcher_permanent_failures_total", "Operations that failed permanently");
    describe_counter!("matcher_fetch_failures_total", "Candidate fetches that failed terminally");

    gauge!("matcher_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}
