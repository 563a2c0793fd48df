//! Report assembly
//!
//! A `Report` is built once by `ReportMerger` and exposes read-only
//! accessors. Operational figures always come from the computed
//! `AggregateMetrics`; the narrative analysis contributes only text.

use crate::models::{
    AggregateMetrics, AnalysisResult, Efficiency, EfficiencyLevel, ReliabilityRisk, StaticFacts,
    WorkloadRef,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Efficiency and reliability report for one workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    workload: WorkloadRef,
    facts: StaticFacts,
    metrics: AggregateMetrics,
    analysis: AnalysisResult,
    generated_at: DateTime<Utc>,
}

impl Report {
    pub fn workload(&self) -> &WorkloadRef {
        &self.workload
    }

    pub fn facts(&self) -> &StaticFacts {
        &self.facts
    }

    pub fn metrics(&self) -> &AggregateMetrics {
        &self.metrics
    }

    pub fn analysis(&self) -> &AnalysisResult {
        &self.analysis
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn replica_count(&self) -> &str {
        &self.metrics.replica_count
    }

    pub fn efficiency(&self) -> &Efficiency {
        &self.metrics.efficiency
    }

    pub fn efficiency_level(&self) -> EfficiencyLevel {
        self.metrics.efficiency.level()
    }

    pub fn efficiency_percent(&self) -> Option<f64> {
        self.metrics.efficiency.percent()
    }

    pub fn reliability_risk(&self) -> ReliabilityRisk {
        self.analysis.reliability_risk
    }
}

/// Combines facts, metrics and narrative into a `Report`
pub struct ReportMerger;

impl ReportMerger {
    pub fn merge(
        workload: WorkloadRef,
        facts: StaticFacts,
        metrics: AggregateMetrics,
        analysis: AnalysisResult,
    ) -> Report {
        Self::merge_at(workload, facts, metrics, analysis, Utc::now())
    }

    /// Merge with an explicit generation timestamp
    pub fn merge_at(
        workload: WorkloadRef,
        facts: StaticFacts,
        metrics: AggregateMetrics,
        analysis: AnalysisResult,
        generated_at: DateTime<Utc>,
    ) -> Report {
        Report {
            workload,
            facts,
            metrics,
            analysis,
            generated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::parse_analysis;
    use crate::models::WorkloadKind;
    use chrono::TimeZone;

    fn metrics() -> AggregateMetrics {
        AggregateMetrics {
            replica_count: "3".to_string(),
            avg_cpu_millicores: Some(150),
            avg_memory_bytes: Some(256 * 1024 * 1024),
            efficiency: Efficiency::Rated {
                level: EfficiencyLevel::High,
                percent: 90.0,
            },
            pods_sampled: 3,
            pods_failed: 0,
            autoscaler: None,
        }
    }

    fn facts() -> StaticFacts {
        StaticFacts {
            main_container: Some("web".to_string()),
            container_count: 1,
            priority_class_name: None,
            desired_replicas: Some(3),
        }
    }

    #[test]
    fn test_ai_numbers_do_not_override_computed_metrics() {
        let analysis = parse_analysis(
            r#"{
                "analysis": "Looks fine",
                "reliability_risk": "Low",
                "replica_count": "10/10",
                "cpu_utilization": "5%",
                "memory_utilization": "7%",
                "efficiency_rate": "Low",
                "main_container": "something-else"
            }"#,
        )
        .unwrap();

        let report = ReportMerger::merge(
            WorkloadRef::new("default", WorkloadKind::Deployment, "web"),
            facts(),
            metrics(),
            analysis,
        );

        assert_eq!(report.replica_count(), "3");
        assert_eq!(report.efficiency_level(), EfficiencyLevel::High);
        assert_eq!(report.efficiency_percent(), Some(90.0));
        assert_eq!(report.facts().main_container.as_deref(), Some("web"));
        assert_eq!(report.analysis().narrative, "Looks fine");
        assert_eq!(report.reliability_risk(), ReliabilityRisk::Low);
    }

    #[test]
    fn test_report_serializes_and_restores() {
        let generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let report = ReportMerger::merge_at(
            WorkloadRef::new("default", WorkloadKind::Deployment, "web"),
            facts(),
            metrics(),
            AnalysisResult::default(),
            generated_at,
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["metrics"]["efficiency"]["status"], "rated");
        assert_eq!(json["metrics"]["replica_count"], "3");
        assert_eq!(json["workload"]["kind"], "Deployment");

        let restored: Report = serde_json::from_value(json).unwrap();
        assert_eq!(restored, report);
    }
}
