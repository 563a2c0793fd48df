//! Cluster reader backed by the Kubernetes API
//!
//! Workloads are read from apps/v1, autoscalers from autoscaling/v2 and
//! usage samples from the metrics-server (`metrics.k8s.io/v1beta1`), which
//! is queried with raw requests since it has no typed API.

use super::quantity::{parse_cpu_millicores, parse_memory_bytes};
use super::{async_trait, ClusterReader};
use crate::error::AnalyzerError;
use crate::models::{
    AutoscalerStatus, ContainerSpec, PodIdentity, PodSample, PodTemplateSpec, WorkloadKind,
    WorkloadRef,
};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{Container, Pod, PodTemplateSpec as K8sPodTemplateSpec};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{Api, ListParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config, Resource,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use tracing::debug;

/// Per-kind accessors for the pod template and selector of a workload
trait PodTemplateSource {
    fn selector(&self) -> Option<&LabelSelector>;
    fn template(&self) -> Option<&K8sPodTemplateSpec>;
    fn desired_replicas(&self) -> Option<i32>;
}

impl PodTemplateSource for Deployment {
    fn selector(&self) -> Option<&LabelSelector> {
        self.spec.as_ref().map(|s| &s.selector)
    }

    fn template(&self) -> Option<&K8sPodTemplateSpec> {
        self.spec.as_ref().map(|s| &s.template)
    }

    fn desired_replicas(&self) -> Option<i32> {
        // The API server defaults an omitted replica count to 1
        self.spec.as_ref().map(|s| s.replicas.unwrap_or(1))
    }
}

impl PodTemplateSource for StatefulSet {
    fn selector(&self) -> Option<&LabelSelector> {
        self.spec.as_ref().map(|s| &s.selector)
    }

    fn template(&self) -> Option<&K8sPodTemplateSpec> {
        self.spec.as_ref().map(|s| &s.template)
    }

    fn desired_replicas(&self) -> Option<i32> {
        self.spec.as_ref().map(|s| s.replicas.unwrap_or(1))
    }
}

impl PodTemplateSource for DaemonSet {
    fn selector(&self) -> Option<&LabelSelector> {
        self.spec.as_ref().map(|s| &s.selector)
    }

    fn template(&self) -> Option<&K8sPodTemplateSpec> {
        self.spec.as_ref().map(|s| &s.template)
    }

    fn desired_replicas(&self) -> Option<i32> {
        None
    }
}

/// Kubernetes API cluster reader
#[derive(Clone)]
pub struct KubeClusterReader {
    client: Client,
}

impl KubeClusterReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using in-cluster config or the default kubeconfig
    pub async fn try_default() -> Result<Self, AnalyzerError> {
        let client = Client::try_default()
            .await
            .map_err(|e| AnalyzerError::Config(format!("failed to create Kubernetes client: {}", e)))?;
        Ok(Self::new(client))
    }

    /// Connect using an explicit kubeconfig file and optional context
    pub async fn from_kubeconfig(path: &Path, context: Option<&str>) -> Result<Self, AnalyzerError> {
        let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
            AnalyzerError::Config(format!("failed to read kubeconfig {}: {}", path.display(), e))
        })?;

        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            ..Default::default()
        };

        let config = Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| AnalyzerError::Config(format!("invalid kubeconfig: {}", e)))?;

        let client = Client::try_from(config)
            .map_err(|e| AnalyzerError::Config(format!("failed to create Kubernetes client: {}", e)))?;

        Ok(Self::new(client))
    }

    async fn fetch_template<K>(&self, workload: &WorkloadRef) -> Result<PodTemplateSpec, AnalyzerError>
    where
        K: PodTemplateSource
            + Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), &workload.namespace);

        let object = api
            .get_opt(&workload.name)
            .await
            .map_err(|e| map_kube_error(e, workload.to_string()))?
            .ok_or_else(|| AnalyzerError::NotFound(workload.to_string()))?;

        to_pod_template(&object)
            .ok_or_else(|| AnalyzerError::Cluster(format!("{} has no pod template", workload)))
    }
}

#[async_trait]
impl ClusterReader for KubeClusterReader {
    async fn get_pod_template(&self, workload: &WorkloadRef) -> Result<PodTemplateSpec, AnalyzerError> {
        match workload.kind {
            WorkloadKind::Deployment => self.fetch_template::<Deployment>(workload).await,
            WorkloadKind::StatefulSet => self.fetch_template::<StatefulSet>(workload).await,
            WorkloadKind::DaemonSet => self.fetch_template::<DaemonSet>(workload).await,
        }
    }

    async fn get_autoscaler_status(
        &self,
        workload: &WorkloadRef,
    ) -> Result<Option<AutoscalerStatus>, AnalyzerError> {
        let api: Api<HorizontalPodAutoscaler> =
            Api::namespaced(self.client.clone(), &workload.namespace);

        let hpa = api
            .get_opt(&workload.name)
            .await
            .map_err(|e| map_kube_error(e, format!("autoscaler {}", workload.name)))?;

        Ok(hpa.and_then(|hpa| to_autoscaler_status(&hpa, workload)))
    }

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<PodIdentity>, AnalyzerError> {
        // An empty selector would match every pod in the namespace
        if selector.is_empty() {
            return Ok(Vec::new());
        }

        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&ListParams::default().labels(selector))
            .await
            .map_err(|e| map_kube_error(e, format!("pods matching {}", selector)))?;

        Ok(pods
            .items
            .into_iter()
            .filter_map(|pod| {
                let name = pod.metadata.name?;
                let phase = pod.status.and_then(|s| s.phase);
                Some(PodIdentity { name, phase })
            })
            .collect())
    }

    async fn get_pod_usage(&self, namespace: &str, pod_name: &str) -> Result<PodSample, AnalyzerError> {
        let path = format!(
            "/apis/metrics.k8s.io/v1beta1/namespaces/{}/pods/{}",
            namespace, pod_name
        );

        let request = http::Request::builder()
            .method("GET")
            .uri(&path)
            .body(Vec::new())
            .map_err(|e| AnalyzerError::Cluster(format!("failed to build request: {}", e)))?;

        let metrics = self
            .client
            .request::<PodMetricsItem>(request)
            .await
            .map_err(|e| map_kube_error(e, format!("metrics for pod {}", pod_name)))?;

        let sample = to_pod_sample(metrics);
        debug!(
            pod = %sample.pod_name,
            cpu_millicores = sample.cpu_usage_millicores,
            memory_bytes = sample.memory_usage_bytes,
            "Fetched pod usage"
        );
        Ok(sample)
    }
}

// Metrics API response shape

#[derive(Debug, Deserialize)]
struct PodMetricsItem {
    metadata: PodMetricsMetadata,
    #[serde(default)]
    containers: Vec<ContainerMetricsItem>,
}

#[derive(Debug, Deserialize)]
struct PodMetricsMetadata {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ContainerMetricsItem {
    usage: ResourceUsage,
}

#[derive(Debug, Deserialize)]
struct ResourceUsage {
    cpu: String,
    memory: String,
}

fn to_pod_sample(metrics: PodMetricsItem) -> PodSample {
    let (cpu, memory) = metrics.containers.iter().fold((0u64, 0u64), |(cpu, mem), c| {
        (
            cpu + parse_cpu_millicores(&c.usage.cpu).unwrap_or(0),
            mem + parse_memory_bytes(&c.usage.memory).unwrap_or(0),
        )
    });

    PodSample {
        pod_name: metrics.metadata.name,
        cpu_usage_millicores: cpu,
        memory_usage_bytes: memory,
    }
}

fn to_pod_template<K: PodTemplateSource>(workload: &K) -> Option<PodTemplateSpec> {
    let template = workload.template()?;
    let pod_spec = template.spec.as_ref();

    Some(PodTemplateSpec {
        containers: pod_spec
            .map(|spec| spec.containers.iter().map(to_container_spec).collect())
            .unwrap_or_default(),
        selector: workload.selector().map(format_label_selector).unwrap_or_default(),
        priority_class_name: pod_spec.and_then(|spec| spec.priority_class_name.clone()),
        desired_replicas: workload.desired_replicas(),
    })
}

fn to_container_spec(container: &Container) -> ContainerSpec {
    let resources = container.resources.as_ref();
    let requests = resources.and_then(|r| r.requests.as_ref());
    let limits = resources.and_then(|r| r.limits.as_ref());

    ContainerSpec {
        name: container.name.clone(),
        image: container.image.clone().unwrap_or_default(),
        cpu_request_millicores: quantity_of(requests, "cpu", parse_cpu_millicores),
        cpu_limit_millicores: quantity_of(limits, "cpu", parse_cpu_millicores),
        memory_request_bytes: quantity_of(requests, "memory", parse_memory_bytes),
        memory_limit_bytes: quantity_of(limits, "memory", parse_memory_bytes),
    }
}

/// Parsed value of one resource entry, zero when unset or unparseable
fn quantity_of(
    resources: Option<&BTreeMap<String, Quantity>>,
    key: &str,
    parse: fn(&str) -> Option<u64>,
) -> u64 {
    let Some(quantity) = resources.and_then(|r| r.get(key)) else {
        return 0;
    };

    parse(&quantity.0).unwrap_or_else(|| {
        debug!(resource = key, quantity = %quantity.0, "Unparseable resource quantity, treating as unset");
        0
    })
}

/// Render a label selector in the `kubectl -l` syntax
fn format_label_selector(selector: &LabelSelector) -> String {
    let mut parts: Vec<String> = selector
        .match_labels
        .iter()
        .flatten()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();

    for expr in selector.match_expressions.iter().flatten() {
        let values = expr.values.clone().unwrap_or_default().join(",");
        let part = match expr.operator.as_str() {
            "In" => format!("{} in ({})", expr.key, values),
            "NotIn" => format!("{} notin ({})", expr.key, values),
            "Exists" => expr.key.clone(),
            "DoesNotExist" => format!("!{}", expr.key),
            other => {
                debug!(operator = %other, key = %expr.key, "Skipping unknown selector operator");
                continue;
            }
        };
        parts.push(part);
    }

    parts.join(",")
}

fn to_autoscaler_status(hpa: &HorizontalPodAutoscaler, workload: &WorkloadRef) -> Option<AutoscalerStatus> {
    if let Some(spec) = &hpa.spec {
        let target = &spec.scale_target_ref;
        if target.kind != workload.kind.as_str() || target.name != workload.name {
            debug!(
                autoscaler = ?hpa.metadata.name,
                target_kind = %target.kind,
                target_name = %target.name,
                "Autoscaler targets a different workload"
            );
            return None;
        }
    }

    let status = hpa.status.as_ref()?;

    let utilization = |resource: &str| {
        status
            .current_metrics
            .iter()
            .flatten()
            .filter_map(|m| m.resource.as_ref())
            .find(|r| r.name == resource)
            .and_then(|r| r.current.average_utilization)
    };

    Some(AutoscalerStatus {
        current_replicas: status.current_replicas.unwrap_or(0),
        desired_replicas: status.desired_replicas,
        cpu_utilization_percent: utilization("cpu"),
        memory_utilization_percent: utilization("memory"),
    })
}

fn map_kube_error(err: kube::Error, resource: impl Into<String>) -> AnalyzerError {
    let resource = resource.into();
    match err {
        kube::Error::Api(response) => match response.code {
            404 => AnalyzerError::NotFound(resource),
            401 | 403 => AnalyzerError::PermissionDenied {
                resource,
                message: response.message,
            },
            _ => AnalyzerError::Cluster(format!("{}: {}", resource, response.message)),
        },
        other => AnalyzerError::Cluster(format!("{}: {}", resource, other)),
    }
}
