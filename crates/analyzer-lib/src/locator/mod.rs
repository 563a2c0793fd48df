//! Workload resolution against the cluster
//!
//! The locator turns a `WorkloadRef` into the pod template facts and the
//! optional autoscaler status the rest of the pipeline works from. Cluster
//! access goes through the `ClusterReader` trait so the pipeline can run
//! against the Kubernetes API or an in-memory fixture.

mod kube_reader;
pub mod quantity;

#[cfg(any(test, feature = "test-util"))]
mod fixture;

pub use kube_reader::KubeClusterReader;

#[cfg(any(test, feature = "test-util"))]
pub use fixture::InMemoryClusterReader;

use crate::error::AnalyzerError;
use crate::models::{AutoscalerStatus, PodIdentity, PodSample, PodTemplateSpec, WorkloadRef};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use async_trait::async_trait;

/// Read-only view of the cluster used by the pipeline
#[async_trait]
pub trait ClusterReader: Send + Sync {
    /// Resolve the pod template of a workload
    async fn get_pod_template(&self, workload: &WorkloadRef) -> Result<PodTemplateSpec, AnalyzerError>;

    /// Autoscaler status for a workload, `None` when no autoscaler targets it
    async fn get_autoscaler_status(
        &self,
        workload: &WorkloadRef,
    ) -> Result<Option<AutoscalerStatus>, AnalyzerError>;

    /// List pods matching a label selector
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<PodIdentity>, AnalyzerError>;

    /// Fetch the current usage sample of one pod
    async fn get_pod_usage(&self, namespace: &str, pod_name: &str) -> Result<PodSample, AnalyzerError>;
}

/// Resolves workloads to their pod template and autoscaler status
#[derive(Clone)]
pub struct WorkloadLocator {
    reader: Arc<dyn ClusterReader>,
}

impl WorkloadLocator {
    pub fn new(reader: Arc<dyn ClusterReader>) -> Self {
        Self { reader }
    }

    /// Single point-in-time read of the workload, no retries
    ///
    /// Autoscaler lookup failures only affect the replica label, so they are
    /// logged and treated as "no autoscaler".
    pub async fn locate(
        &self,
        workload: &WorkloadRef,
    ) -> Result<(PodTemplateSpec, Option<AutoscalerStatus>), AnalyzerError> {
        let template = self.reader.get_pod_template(workload).await?;
        info!(
            workload = %workload,
            containers = template.containers.len(),
            selector = %template.selector,
            "Resolved workload pod template"
        );

        let autoscaler = match self.reader.get_autoscaler_status(workload).await {
            Ok(status) => status,
            Err(e) => {
                warn!(workload = %workload, error = %e, "Autoscaler lookup failed, ignoring");
                None
            }
        };

        if let Some(status) = &autoscaler {
            debug!(
                workload = %workload,
                replicas = %status.replica_label(),
                "Found autoscaler for workload"
            );
        }

        Ok((template, autoscaler))
    }
}
