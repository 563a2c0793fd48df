//! Prompt construction for the inference request
//!
//! The pod template is rendered to canonical spec text, reduced to its
//! container section and embedded into a fixed analysis template.

mod render;
mod summarize;

pub use render::render_spec_text;
pub use summarize::{summarize, SummaryConfig, ALLOWED_KEYS};

use crate::models::{PodTemplateSpec, WorkloadRef};
use tracing::debug;

/// Version of the response schema the template asks for
pub const SCHEMA_VERSION: &str = "v1";

/// System message establishing the assistant role
pub const SYSTEM_PROMPT: &str = "You are a Kubernetes reliability and capacity expert. \
Assess container configuration, resource sizing, probes and security settings, \
and answer only with the JSON object requested.";

const ANALYSIS_TEMPLATE: &str = r#"Assess the {workload_kind} "{workload_name}" in namespace "{namespace}".

Respond with exactly one JSON object and nothing else, using this schema (v1):
{
  "analysis": "assessment of resource sizing, configuration quality, probes, security posture and availability",
  "reliability_risk": "Low | Medium | High",
  "opportunities": ["concrete optimisation opportunity"],
  "cautions": ["risk worth watching, with its impact"],
  "blockers": ["issue that must be fixed before scaling or promoting"],
  "recommendations": ["specific, actionable configuration change"]
}

Usage figures are measured separately; do not estimate replica counts or utilisation.

Container configuration:
{container_summary}"#;

/// Builds bounded, deterministic prompts for a workload
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    config: SummaryConfig,
}

impl PromptBuilder {
    pub fn new(config: SummaryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// Reduce raw spec text to the container summary
    pub fn summarize(&self, spec_text: &str) -> String {
        summarize(spec_text, &self.config)
    }

    /// Embed a summary into the analysis template
    pub fn build_prompt(&self, workload: &WorkloadRef, summary: &str) -> String {
        // Summary goes in last so its contents are never treated as placeholders
        ANALYSIS_TEMPLATE
            .replace("{workload_kind}", workload.kind.as_str())
            .replace("{workload_name}", &workload.name)
            .replace("{namespace}", &workload.namespace)
            .replace("{container_summary}", summary)
    }

    /// Render, summarize and template a resolved workload
    pub fn prompt_for(&self, workload: &WorkloadRef, template: &PodTemplateSpec) -> String {
        let spec_text = render_spec_text(workload, template);
        let summary = self.summarize(&spec_text);
        debug!(
            workload = %workload,
            summary_lines = summary.lines().count(),
            "Built container summary"
        );
        self.build_prompt(workload, &summary)
    }
}
