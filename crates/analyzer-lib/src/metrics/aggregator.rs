//! Per-pod usage aggregation
//!
//! Usage samples are fetched concurrently behind a semaphore and reduced in
//! a single join loop, so the running totals are owned by one task.

use super::efficiency::compute_efficiency;
use crate::cancel::CancellationToken;
use crate::error::AnalyzerError;
use crate::locator::ClusterReader;
use crate::models::{AggregateMetrics, AutoscalerStatus, ContainerSpec, PodIdentity, PodSample};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Configuration for usage aggregation
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Maximum concurrent per-pod usage fetches (default: 8)
    pub fetch_concurrency: usize,
    /// Timeout for a single pod usage fetch (default: 10 seconds)
    pub fetch_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: 8,
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

/// Running totals over successful samples
#[derive(Debug, Default)]
struct UsageTotals {
    cpu_millicores: u64,
    memory_bytes: u64,
    sampled: usize,
    failed: usize,
}

impl UsageTotals {
    fn record(&mut self, sample: &PodSample) {
        self.cpu_millicores += sample.cpu_usage_millicores;
        self.memory_bytes += sample.memory_usage_bytes;
        self.sampled += 1;
    }

    fn record_failure(&mut self) {
        self.failed += 1;
    }
}

/// Reduces per-pod usage samples into workload-level metrics
#[derive(Clone)]
pub struct MetricsAggregator {
    reader: Arc<dyn ClusterReader>,
    config: AggregatorConfig,
}

impl MetricsAggregator {
    pub fn new(reader: Arc<dyn ClusterReader>, config: AggregatorConfig) -> Self {
        Self { reader, config }
    }

    /// Aggregate usage of the pods matching `selector`
    ///
    /// Metrics problems never abort: they produce `NotAvailable` efficiency
    /// with a reason. The only error is cancellation before any sample was
    /// gathered; cancellation after that returns the partial aggregate.
    pub async fn aggregate(
        &self,
        namespace: &str,
        selector: &str,
        containers: &[ContainerSpec],
        autoscaler: Option<AutoscalerStatus>,
        cancel: &CancellationToken,
    ) -> Result<AggregateMetrics, AnalyzerError> {
        let pods = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AnalyzerError::Cancelled),
            result = self.reader.list_pods(namespace, selector) => result,
        };

        let pods = match pods {
            Ok(pods) => pods,
            Err(e) => {
                warn!(namespace = %namespace, selector = %selector, error = %e, "Failed to list pods");
                return Ok(with_autoscaler(
                    AggregateMetrics::unavailable("N/A", format!("failed to list pods: {}", e)),
                    autoscaler,
                ));
            }
        };

        let listed = pods.len();
        let pods: Vec<PodIdentity> = pods.into_iter().filter(|pod| pod.is_running()).collect();
        if pods.len() < listed {
            debug!(
                namespace = %namespace,
                skipped = listed - pods.len(),
                "Skipping pods that are not running"
            );
        }

        if pods.is_empty() {
            info!(namespace = %namespace, selector = %selector, "No running pods match workload selector");
            return Ok(with_autoscaler(
                AggregateMetrics::unavailable("0", "no running pods"),
                autoscaler,
            ));
        }

        let (totals, cancelled) = self.collect_samples(namespace, pods, cancel).await;

        if totals.sampled == 0 {
            if cancelled {
                return Err(AnalyzerError::Cancelled);
            }
            warn!(
                namespace = %namespace,
                failed = totals.failed,
                "No usage samples available for any pod"
            );
            let mut metrics = AggregateMetrics::unavailable("0", "no metrics available");
            metrics.pods_failed = totals.failed;
            return Ok(with_autoscaler(metrics, autoscaler));
        }

        let count = totals.sampled as u64;
        let avg_cpu = totals.cpu_millicores / count;
        let avg_memory = totals.memory_bytes / count;
        let efficiency = compute_efficiency(avg_cpu, avg_memory, containers.first());

        info!(
            namespace = %namespace,
            sampled = totals.sampled,
            failed = totals.failed,
            avg_cpu_millicores = avg_cpu,
            avg_memory_bytes = avg_memory,
            efficiency = %efficiency,
            partial = cancelled,
            "Aggregated workload usage"
        );

        Ok(with_autoscaler(
            AggregateMetrics {
                replica_count: totals.sampled.to_string(),
                avg_cpu_millicores: Some(avg_cpu),
                avg_memory_bytes: Some(avg_memory),
                efficiency,
                pods_sampled: totals.sampled,
                pods_failed: totals.failed,
                autoscaler: None,
            },
            autoscaler,
        ))
    }

    /// Fetch samples concurrently and reduce them; returns whether cancellation cut it short
    async fn collect_samples(
        &self,
        namespace: &str,
        pods: Vec<PodIdentity>,
        cancel: &CancellationToken,
    ) -> (UsageTotals, bool) {
        let semaphore = Arc::new(Semaphore::new(self.config.fetch_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut totals = UsageTotals::default();
        let mut cancelled = false;

        for pod in pods {
            // Stop issuing new fetches once cancelled
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let reader = Arc::clone(&self.reader);
            let namespace = namespace.to_string();
            let timeout = self.config.fetch_timeout;

            tasks.spawn(async move {
                let _permit = permit;
                let result = match tokio::time::timeout(timeout, reader.get_pod_usage(&namespace, &pod.name)).await {
                    Ok(result) => result,
                    Err(_) => Err(AnalyzerError::Cluster(format!(
                        "usage fetch timed out after {}s",
                        timeout.as_secs()
                    ))),
                };
                (pod.name, result)
            });
        }

        if cancelled {
            tasks.abort_all();
        }

        while !tasks.is_empty() {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled(), if !cancelled => {
                    cancelled = true;
                    tasks.abort_all();
                    continue;
                }
                joined = tasks.join_next() => joined,
            };

            match joined {
                Some(Ok((pod_name, Ok(sample)))) => {
                    debug!(pod = %pod_name, cpu = sample.cpu_usage_millicores, "Recorded pod sample");
                    totals.record(&sample);
                }
                Some(Ok((pod_name, Err(e)))) => {
                    debug!(pod = %pod_name, error = %e, "Skipping pod without usage sample");
                    totals.record_failure();
                }
                // Aborted by cancellation
                Some(Err(e)) if e.is_cancelled() => {}
                Some(Err(e)) => {
                    warn!(error = %e, "Usage fetch task panicked");
                    totals.record_failure();
                }
                None => break,
            }
        }

        (totals, cancelled)
    }
}

fn with_autoscaler(mut metrics: AggregateMetrics, autoscaler: Option<AutoscalerStatus>) -> AggregateMetrics {
    if let Some(status) = &autoscaler {
        metrics.replica_count = status.replica_label();
    }
    metrics.autoscaler = autoscaler;
    metrics
}
