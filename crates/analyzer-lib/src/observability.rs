//! Observability for the analysis pipeline
//!
//! Provides:
//! - Prometheus metrics (analysis and gateway latency, pod sampling, failures by code)
//! - Structured event logging with tracing

use crate::error::AnalyzerError;
use crate::models::WorkloadRef;
use crate::report::Report;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Latency buckets in seconds; inference calls routinely take several seconds
const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0];

static GLOBAL_METRICS: OnceLock<AnalyzerMetricsInner> = OnceLock::new();

struct AnalyzerMetricsInner {
    analysis_latency_seconds: Histogram,
    gateway_latency_seconds: Histogram,
    analyses_completed: IntCounter,
    analyses_failed: IntCounterVec,
    pods_sampled: IntCounter,
    pod_sample_failures: IntCounter,
}

impl AnalyzerMetricsInner {
    fn new() -> Self {
        Self {
            analysis_latency_seconds: register_histogram!(
                "workload_analyzer_analysis_latency_seconds",
                "End-to-end time to produce a workload report",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register analysis_latency_seconds"),

            gateway_latency_seconds: register_histogram!(
                "workload_analyzer_gateway_latency_seconds",
                "Time spent waiting on the inference endpoint",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register gateway_latency_seconds"),

            analyses_completed: register_int_counter!(
                "workload_analyzer_analyses_completed_total",
                "Reports produced successfully"
            )
            .expect("Failed to register analyses_completed"),

            analyses_failed: register_int_counter_vec!(
                "workload_analyzer_analyses_failed_total",
                "Analyses that ended in an error, by error code",
                &["code"]
            )
            .expect("Failed to register analyses_failed"),

            pods_sampled: register_int_counter!(
                "workload_analyzer_pods_sampled_total",
                "Pod usage samples gathered"
            )
            .expect("Failed to register pods_sampled"),

            pod_sample_failures: register_int_counter!(
                "workload_analyzer_pod_sample_failures_total",
                "Pod usage fetches that failed or timed out"
            )
            .expect("Failed to register pod_sample_failures"),
        }
    }
}

/// Handle to the process-wide analyzer metrics
///
/// Clones share the same registered collectors.
#[derive(Clone)]
pub struct AnalyzerMetrics {
    _private: (),
}

impl Default for AnalyzerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AnalyzerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AnalyzerMetricsInner {
        GLOBAL_METRICS.get_or_init(AnalyzerMetricsInner::new)
    }

    pub fn observe_analysis_latency(&self, duration_secs: f64) {
        self.inner().analysis_latency_seconds.observe(duration_secs);
    }

    pub fn observe_gateway_latency(&self, duration_secs: f64) {
        self.inner().gateway_latency_seconds.observe(duration_secs);
    }

    pub fn inc_analyses_completed(&self) {
        self.inner().analyses_completed.inc();
    }

    pub fn inc_analyses_failed(&self, error: &AnalyzerError) {
        self.inner()
            .analyses_failed
            .with_label_values(&[error.code()])
            .inc();
    }

    /// Count the sampling outcome of one aggregation
    pub fn record_pod_sampling(&self, sampled: usize, failed: usize) {
        self.inner().pods_sampled.inc_by(sampled as u64);
        self.inner().pod_sample_failures.inc_by(failed as u64);
    }

    pub fn analyses_failed_count(&self, code: &str) -> u64 {
        self.inner().analyses_failed.with_label_values(&[code]).get()
    }

    /// Render the default registry in Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Structured logger for analysis lifecycle events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_analysis_completed(&self, report: &Report, duration_secs: f64) {
        let workload = report.workload();
        info!(
            event = "analysis_completed",
            instance = %self.instance,
            namespace = %workload.namespace,
            kind = %workload.kind,
            name = %workload.name,
            replica_count = %report.replica_count(),
            efficiency = %report.efficiency(),
            reliability_risk = %report.reliability_risk(),
            duration_secs = duration_secs,
            "Workload analysis completed"
        );
    }

    pub fn log_analysis_failed(&self, workload: &WorkloadRef, error: &AnalyzerError, duration_secs: f64) {
        warn!(
            event = "analysis_failed",
            instance = %self.instance,
            namespace = %workload.namespace,
            kind = %workload.kind,
            name = %workload.name,
            code = error.code(),
            error = %error,
            duration_secs = duration_secs,
            "Workload analysis failed"
        );
    }

    pub fn log_startup(&self, version: &str, model: &str) {
        info!(
            event = "analyzer_started",
            instance = %self.instance,
            version = %version,
            model = %model,
            "Workload analyzer started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "analyzer_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Workload analyzer shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_observe_and_render() {
        let metrics = AnalyzerMetrics::new();
        metrics.observe_analysis_latency(1.2);
        metrics.observe_gateway_latency(0.9);
        metrics.record_pod_sampling(3, 1);
        metrics.inc_analyses_completed();

        let text = metrics.render().unwrap();
        assert!(text.contains("workload_analyzer_analysis_latency_seconds"));
        assert!(text.contains("workload_analyzer_pods_sampled_total"));
    }

    #[test]
    fn test_failures_are_labelled_by_code() {
        let metrics = AnalyzerMetrics::new();
        let before = metrics.analyses_failed_count("config_error");

        metrics.inc_analyses_failed(&AnalyzerError::Config("missing key".to_string()));

        assert_eq!(metrics.analyses_failed_count("config_error"), before + 1);
    }

    #[test]
    fn test_structured_logger_instance() {
        let logger = StructuredLogger::new("analyzer-0");
        assert_eq!(logger.instance, "analyzer-0");
    }
}
