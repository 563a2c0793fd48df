//! Core data models for the workload analyzer

use crate::error::AnalyzerError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported workload kinds
///
/// Every kind shares one capability: it owns a pod template and a label
/// selector. Adding a kind means extending every exhaustive match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
}

impl WorkloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadKind {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deployment" | "deployments" | "deploy" => Ok(WorkloadKind::Deployment),
            "statefulset" | "statefulsets" | "sts" => Ok(WorkloadKind::StatefulSet),
            "daemonset" | "daemonsets" | "ds" => Ok(WorkloadKind::DaemonSet),
            _ => Err(AnalyzerError::UnsupportedWorkloadType(s.to_string())),
        }
    }
}

/// Identity of the workload under analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadRef {
    pub namespace: String,
    pub kind: WorkloadKind,
    pub name: String,
}

impl WorkloadRef {
    pub fn new(namespace: impl Into<String>, kind: WorkloadKind, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kind,
            name: name.into(),
        }
    }

    /// Parse a `kind/name` target such as `deploy/web` within a namespace
    pub fn parse_target(namespace: &str, target: &str) -> Result<Self, AnalyzerError> {
        let (kind, name) = target
            .split_once('/')
            .ok_or_else(|| AnalyzerError::InvalidTarget(target.to_string()))?;

        if name.is_empty() {
            return Err(AnalyzerError::InvalidTarget(target.to_string()));
        }

        Ok(Self::new(namespace, kind.parse()?, name))
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} in {}", self.kind, self.name, self.namespace)
    }
}

/// Resource configuration of one container in a pod template
///
/// Unset requests and limits are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub cpu_request_millicores: u64,
    pub cpu_limit_millicores: u64,
    pub memory_request_bytes: u64,
    pub memory_limit_bytes: u64,
}

/// Pod template facts resolved from a workload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodTemplateSpec {
    /// Containers in declaration order
    pub containers: Vec<ContainerSpec>,
    /// Label selector in `k=v,k2=v2` form
    pub selector: String,
    pub priority_class_name: Option<String>,
    /// Desired replicas from the workload spec, when the kind has them
    pub desired_replicas: Option<i32>,
}

/// Horizontal autoscaler status for a workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoscalerStatus {
    pub current_replicas: i32,
    pub desired_replicas: i32,
    pub cpu_utilization_percent: Option<i32>,
    pub memory_utilization_percent: Option<i32>,
}

impl AutoscalerStatus {
    pub fn replica_label(&self) -> String {
        format!("{}/{}", self.current_replicas, self.desired_replicas)
    }
}

/// A pod matched by a workload selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodIdentity {
    pub name: String,
    pub phase: Option<String>,
}

impl PodIdentity {
    /// Whether the pod can report usage; an unknown phase counts as running
    pub fn is_running(&self) -> bool {
        self.phase.as_deref().map_or(true, |phase| phase == "Running")
    }
}

/// Point-in-time usage of one pod, summed over its containers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSample {
    pub pod_name: String,
    pub cpu_usage_millicores: u64,
    pub memory_usage_bytes: u64,
}

/// Efficiency classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EfficiencyLevel {
    Low,
    Medium,
    High,
    NotAvailable,
}

impl fmt::Display for EfficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EfficiencyLevel::Low => "Low",
            EfficiencyLevel::Medium => "Medium",
            EfficiencyLevel::High => "High",
            EfficiencyLevel::NotAvailable => "N/A",
        };
        f.write_str(label)
    }
}

/// Efficiency outcome: a rated percentage or an explicit unavailable reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Efficiency {
    Rated { level: EfficiencyLevel, percent: f64 },
    NotAvailable { reason: String },
}

impl Efficiency {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Efficiency::NotAvailable {
            reason: reason.into(),
        }
    }

    pub fn level(&self) -> EfficiencyLevel {
        match self {
            Efficiency::Rated { level, .. } => *level,
            Efficiency::NotAvailable { .. } => EfficiencyLevel::NotAvailable,
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Efficiency::Rated { percent, .. } => Some(*percent),
            Efficiency::NotAvailable { .. } => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            Efficiency::Rated { .. } => None,
            Efficiency::NotAvailable { reason } => Some(reason),
        }
    }
}

impl fmt::Display for Efficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Efficiency::Rated { level, percent } => write!(f, "{} ({:.1}%)", level, percent),
            Efficiency::NotAvailable { reason } => write!(f, "N/A ({})", reason),
        }
    }
}

/// Aggregated usage figures for a workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    /// `current/desired` from the autoscaler, else the number of sampled pods
    pub replica_count: String,
    pub avg_cpu_millicores: Option<u64>,
    pub avg_memory_bytes: Option<u64>,
    pub efficiency: Efficiency,
    pub pods_sampled: usize,
    pub pods_failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscaler: Option<AutoscalerStatus>,
}

impl AggregateMetrics {
    /// Metrics for a workload whose usage could not be determined
    pub fn unavailable(replica_count: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            replica_count: replica_count.into(),
            avg_cpu_millicores: None,
            avg_memory_bytes: None,
            efficiency: Efficiency::unavailable(reason),
            pods_sampled: 0,
            pods_failed: 0,
            autoscaler: None,
        }
    }
}

/// Qualitative risk label from the narrative analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ReliabilityRisk {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl ReliabilityRisk {
    /// Lenient mapping from free-form model output such as "high - single replica"
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        if label.starts_with("low") {
            ReliabilityRisk::Low
        } else if label.starts_with("medium") || label.starts_with("moderate") {
            ReliabilityRisk::Medium
        } else if label.starts_with("high") || label.starts_with("critical") {
            ReliabilityRisk::High
        } else {
            ReliabilityRisk::Unknown
        }
    }
}

impl<'de> Deserialize<'de> for ReliabilityRisk {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(ReliabilityRisk::from_label)
            .unwrap_or_default())
    }
}

impl fmt::Display for ReliabilityRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReliabilityRisk::Low => "Low",
            ReliabilityRisk::Medium => "Medium",
            ReliabilityRisk::High => "High",
            ReliabilityRisk::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// Narrative assessment decoded from the inference response
///
/// Carries only qualitative fields. Numeric fields the model may emit
/// (`replica_count`, `efficiency_rate`, ...) are ignored on decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAnalysis")]
pub struct AnalysisResult {
    pub narrative: String,
    pub reliability_risk: ReliabilityRisk,
    pub opportunities: Vec<String>,
    pub cautions: Vec<String>,
    pub blockers: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Wire shape of the analysis object
///
/// Models answer with `narrative`, `analysis` or both; `narrative` wins
/// when it is non-empty.
#[derive(Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    narrative: Option<String>,
    #[serde(default)]
    analysis: Option<String>,
    #[serde(default)]
    reliability_risk: ReliabilityRisk,
    #[serde(default, deserialize_with = "string_list")]
    opportunities: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    cautions: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    blockers: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    recommendations: Vec<String>,
}

impl From<RawAnalysis> for AnalysisResult {
    fn from(raw: RawAnalysis) -> Self {
        let narrative = raw
            .narrative
            .filter(|text| !text.trim().is_empty())
            .or(raw.analysis)
            .unwrap_or_default();

        Self {
            narrative,
            reliability_risk: raw.reliability_risk,
            opportunities: raw.opportunities,
            cautions: raw.cautions,
            blockers: raw.blockers,
            recommendations: raw.recommendations,
        }
    }
}

/// List entry as emitted by the model: plain text or a category-tagged object
#[derive(Deserialize)]
#[serde(untagged)]
enum ListItem {
    Text(String),
    Tagged {
        #[serde(default)]
        category: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        severity: String,
        #[serde(default)]
        suggested_action: String,
    },
}

impl ListItem {
    fn into_text(self) -> String {
        match self {
            ListItem::Text(text) => text,
            ListItem::Tagged {
                category,
                description,
                severity,
                suggested_action,
            } => {
                let mut text = String::new();
                if !category.is_empty() {
                    text.push_str(&format!("[{}] ", category));
                }
                text.push_str(&description);
                if !severity.is_empty() {
                    text.push_str(&format!(" (severity: {})", severity));
                }
                if !suggested_action.is_empty() {
                    text.push_str(&format!(" - action: {}", suggested_action));
                }
                text.trim().to_string()
            }
        }
    }
}

fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<ListItem>),
        One(ListItem),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::Many(items)) => items.into_iter().map(ListItem::into_text).collect(),
        Some(OneOrMany::One(item)) => vec![item.into_text()],
    })
}

/// Static facts about the workload, taken from its pod template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticFacts {
    pub main_container: Option<String>,
    pub container_count: usize,
    pub priority_class_name: Option<String>,
    pub desired_replicas: Option<i32>,
}

impl StaticFacts {
    pub fn from_template(template: &PodTemplateSpec) -> Self {
        Self {
            main_container: template.containers.first().map(|c| c.name.clone()),
            container_count: template.containers.len(),
            priority_class_name: template.priority_class_name.clone(),
            desired_replicas: template.desired_replicas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workload_kind_parsing() {
        assert_eq!("deployment".parse::<WorkloadKind>().unwrap(), WorkloadKind::Deployment);
        assert_eq!("StatefulSet".parse::<WorkloadKind>().unwrap(), WorkloadKind::StatefulSet);
        assert_eq!("ds".parse::<WorkloadKind>().unwrap(), WorkloadKind::DaemonSet);

        let err = "cronjob".parse::<WorkloadKind>().unwrap_err();
        assert!(matches!(err, AnalyzerError::UnsupportedWorkloadType(kind) if kind == "cronjob"));
    }

    #[test]
    fn test_workload_ref_parse_target() {
        let workload = WorkloadRef::parse_target("prod", "deploy/web").unwrap();
        assert_eq!(workload.namespace, "prod");
        assert_eq!(workload.kind, WorkloadKind::Deployment);
        assert_eq!(workload.name, "web");

        assert!(WorkloadRef::parse_target("prod", "web").is_err());
        assert!(WorkloadRef::parse_target("prod", "job/web").is_err());
    }

    #[test]
    fn test_efficiency_accessors() {
        let rated = Efficiency::Rated {
            level: EfficiencyLevel::High,
            percent: 90.0,
        };
        assert_eq!(rated.level(), EfficiencyLevel::High);
        assert_eq!(rated.percent(), Some(90.0));
        assert_eq!(rated.unavailable_reason(), None);
        assert_eq!(rated.to_string(), "High (90.0%)");

        let missing = Efficiency::unavailable("no running pods");
        assert_eq!(missing.level(), EfficiencyLevel::NotAvailable);
        assert_eq!(missing.percent(), None);
        assert_eq!(missing.to_string(), "N/A (no running pods)");
    }

    #[test]
    fn test_reliability_risk_lenient_labels() {
        assert_eq!(ReliabilityRisk::from_label("High"), ReliabilityRisk::High);
        assert_eq!(ReliabilityRisk::from_label("medium - single replica"), ReliabilityRisk::Medium);
        assert_eq!(ReliabilityRisk::from_label(" low "), ReliabilityRisk::Low);
        assert_eq!(ReliabilityRisk::from_label("risk-level"), ReliabilityRisk::Unknown);
    }

    #[test]
    fn test_analysis_result_defaults_missing_fields() {
        let result: AnalysisResult = serde_json::from_str(r#"{"narrative":"x"}"#).unwrap();
        assert_eq!(result.narrative, "x");
        assert_eq!(result.reliability_risk, ReliabilityRisk::Unknown);
        assert!(result.opportunities.is_empty());
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_analysis_result_accepts_tagged_recommendations() {
        let json = r#"{
            "analysis": "fine",
            "reliability_risk": null,
            "cautions": null,
            "recommendations": [
                "Set limits",
                {"category": "Resources", "description": "Lower CPU request", "severity": "low", "suggested_action": "set 100m"}
            ]
        }"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();

        assert_eq!(result.narrative, "fine");
        assert!(result.cautions.is_empty());
        assert_eq!(result.recommendations.len(), 2);
        assert_eq!(
            result.recommendations[1],
            "[Resources] Lower CPU request (severity: low) - action: set 100m"
        );
    }

    #[test]
    fn test_analysis_result_with_narrative_and_analysis() {
        let json = r#"{"narrative": "Short.", "analysis": "Long form.", "reliability_risk": "Low"}"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.narrative, "Short.");
        assert_eq!(result.reliability_risk, ReliabilityRisk::Low);

        let json = r#"{"narrative": "  ", "analysis": "Long form."}"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.narrative, "Long form.");

        let result: AnalysisResult = serde_json::from_str(r#"{"narrative": null}"#).unwrap();
        assert_eq!(result.narrative, "");
    }

    #[test]
    fn test_analysis_result_serializes_as_narrative() {
        let result = AnalysisResult {
            narrative: "ok".to_string(),
            reliability_risk: ReliabilityRisk::Medium,
            cautions: vec!["single replica".to_string()],
            ..Default::default()
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["narrative"], "ok");
        assert!(value.get("analysis").is_none());

        let decoded: AnalysisResult = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn test_pod_identity_running() {
        let pod = |phase: Option<&str>| PodIdentity {
            name: "web-0".to_string(),
            phase: phase.map(str::to_string),
        };

        assert!(pod(Some("Running")).is_running());
        assert!(pod(None).is_running());
        assert!(!pod(Some("Pending")).is_running());
        assert!(!pod(Some("Succeeded")).is_running());
    }

    #[test]
    fn test_static_facts_from_template() {
        let template = PodTemplateSpec {
            containers: vec![
                ContainerSpec {
                    name: "app".to_string(),
                    ..Default::default()
                },
                ContainerSpec {
                    name: "sidecar".to_string(),
                    ..Default::default()
                },
            ],
            selector: "app=web".to_string(),
            priority_class_name: Some("high-priority".to_string()),
            desired_replicas: Some(3),
        };

        let facts = StaticFacts::from_template(&template);
        assert_eq!(facts.main_container.as_deref(), Some("app"));
        assert_eq!(facts.container_count, 2);
        assert_eq!(facts.desired_replicas, Some(3));
    }
}
