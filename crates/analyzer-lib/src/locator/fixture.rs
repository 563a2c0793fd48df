//! In-memory cluster reader for tests and offline runs

use super::{async_trait, ClusterReader};
use crate::error::AnalyzerError;
use crate::models::{AutoscalerStatus, PodIdentity, PodSample, PodTemplateSpec, WorkloadRef};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Cluster reader backed by fixed in-memory state
#[derive(Debug, Default)]
pub struct InMemoryClusterReader {
    workloads: HashMap<WorkloadRef, PodTemplateSpec>,
    denied: HashSet<WorkloadRef>,
    autoscalers: HashMap<WorkloadRef, AutoscalerStatus>,
    pods: HashMap<String, Vec<PodIdentity>>,
    usage: HashMap<String, PodSample>,
    usage_delay: Option<Duration>,
    usage_calls: AtomicUsize,
}

impl InMemoryClusterReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workload(mut self, workload: WorkloadRef, template: PodTemplateSpec) -> Self {
        self.workloads.insert(workload, template);
        self
    }

    /// Reads of this workload fail with `PermissionDenied`
    pub fn with_denied(mut self, workload: WorkloadRef) -> Self {
        self.denied.insert(workload);
        self
    }

    pub fn with_autoscaler(mut self, workload: WorkloadRef, status: AutoscalerStatus) -> Self {
        self.autoscalers.insert(workload, status);
        self
    }

    /// Register a pod under a selector, with an optional usage sample
    ///
    /// Pods without a sample fail their usage fetch.
    pub fn with_pod(self, selector: &str, pod_name: &str, usage: Option<(u64, u64)>) -> Self {
        self.with_pod_in_phase(selector, pod_name, "Running", usage)
    }

    /// Register a pod in a given lifecycle phase
    pub fn with_pod_in_phase(
        mut self,
        selector: &str,
        pod_name: &str,
        phase: &str,
        usage: Option<(u64, u64)>,
    ) -> Self {
        self.pods
            .entry(selector.to_string())
            .or_default()
            .push(PodIdentity {
                name: pod_name.to_string(),
                phase: Some(phase.to_string()),
            });

        if let Some((cpu_millicores, memory_bytes)) = usage {
            self.usage.insert(
                pod_name.to_string(),
                PodSample {
                    pod_name: pod_name.to_string(),
                    cpu_usage_millicores: cpu_millicores,
                    memory_usage_bytes: memory_bytes,
                },
            );
        }
        self
    }

    /// Delay every usage fetch, for cancellation tests
    pub fn with_usage_delay(mut self, delay: Duration) -> Self {
        self.usage_delay = Some(delay);
        self
    }

    /// Number of usage fetches issued so far
    pub fn usage_calls(&self) -> usize {
        self.usage_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterReader for InMemoryClusterReader {
    async fn get_pod_template(&self, workload: &WorkloadRef) -> Result<PodTemplateSpec, AnalyzerError> {
        if self.denied.contains(workload) {
            return Err(AnalyzerError::PermissionDenied {
                resource: workload.to_string(),
                message: "forbidden".to_string(),
            });
        }

        self.workloads
            .get(workload)
            .cloned()
            .ok_or_else(|| AnalyzerError::NotFound(workload.to_string()))
    }

    async fn get_autoscaler_status(
        &self,
        workload: &WorkloadRef,
    ) -> Result<Option<AutoscalerStatus>, AnalyzerError> {
        Ok(self.autoscalers.get(workload).cloned())
    }

    async fn list_pods(&self, _namespace: &str, selector: &str) -> Result<Vec<PodIdentity>, AnalyzerError> {
        Ok(self.pods.get(selector).cloned().unwrap_or_default())
    }

    async fn get_pod_usage(&self, _namespace: &str, pod_name: &str) -> Result<PodSample, AnalyzerError> {
        self.usage_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.usage_delay {
            tokio::time::sleep(delay).await;
        }

        self.usage
            .get(pod_name)
            .cloned()
            .ok_or_else(|| AnalyzerError::Cluster(format!("no metrics for pod {}", pod_name)))
    }
}
