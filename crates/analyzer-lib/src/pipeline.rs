//! End-to-end analysis of one workload
//!
//! Stages run sequentially: locate, aggregate, build prompt, request the
//! narrative, merge. Only per-pod usage fetches run concurrently, inside
//! the aggregator.

use crate::cancel::CancellationToken;
use crate::error::AnalyzerError;
use crate::gateway::{AiGateway, Credentials, GatewayConfig};
use crate::health::HealthRegistry;
use crate::locator::{ClusterReader, WorkloadLocator};
use crate::metrics::{AggregatorConfig, MetricsAggregator};
use crate::models::{AggregateMetrics, StaticFacts, WorkloadRef};
use crate::observability::{AnalyzerMetrics, StructuredLogger};
use crate::prompt::{PromptBuilder, SummaryConfig};
use crate::report::{Report, ReportMerger};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

/// Failed analysis, with whatever was gathered before the failing stage
///
/// Locator failures carry no facts; aggregation and gateway failures keep
/// the static facts (and metrics, when aggregation finished) for diagnostics.
#[derive(Debug, Clone, Error)]
#[error("analysis of {workload} failed: {error}")]
pub struct AnalyzeFailure {
    pub workload: WorkloadRef,
    pub facts: Option<StaticFacts>,
    pub metrics: Option<AggregateMetrics>,
    #[source]
    pub error: AnalyzerError,
}

impl AnalyzeFailure {
    fn new(workload: &WorkloadRef, error: AnalyzerError) -> Self {
        Self {
            workload: workload.clone(),
            facts: None,
            metrics: None,
            error,
        }
    }

    fn with_facts(mut self, facts: &StaticFacts) -> Self {
        self.facts = Some(facts.clone());
        self
    }

    fn with_metrics(mut self, metrics: &AggregateMetrics) -> Self {
        self.metrics = Some(metrics.clone());
        self
    }
}

/// Runs the analysis pipeline
#[derive(Clone)]
pub struct Analyzer {
    locator: WorkloadLocator,
    aggregator: MetricsAggregator,
    prompts: PromptBuilder,
    gateway: AiGateway,
    credentials: Credentials,
    metrics: AnalyzerMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
}

impl Analyzer {
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    pub fn gateway_config(&self) -> &GatewayConfig {
        self.gateway.config()
    }

    /// Produce a report for `workload`
    pub async fn analyze(
        &self,
        workload: &WorkloadRef,
        cancel: &CancellationToken,
    ) -> Result<Report, AnalyzeFailure> {
        let start = Instant::now();
        let result = self.run(workload, cancel).await;
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(report) => {
                self.metrics.observe_analysis_latency(elapsed);
                self.metrics.inc_analyses_completed();
                self.logger.log_analysis_completed(report, elapsed);
                if let Some(health) = &self.health {
                    health.record_success().await;
                }
            }
            Err(failure) => {
                self.metrics.inc_analyses_failed(&failure.error);
                self.logger.log_analysis_failed(workload, &failure.error, elapsed);
                if let Some(health) = &self.health {
                    health.record_failure(&failure.error).await;
                }
            }
        }

        result
    }

    async fn run(&self, workload: &WorkloadRef, cancel: &CancellationToken) -> Result<Report, AnalyzeFailure> {
        let fail = |error| AnalyzeFailure::new(workload, error);

        let (template, autoscaler) = until_cancelled(cancel, self.locator.locate(workload))
            .await
            .map_err(fail)?;
        let facts = StaticFacts::from_template(&template);

        let metrics = self
            .aggregator
            .aggregate(
                &workload.namespace,
                &template.selector,
                &template.containers,
                autoscaler,
                cancel,
            )
            .await
            .map_err(|e| fail(e).with_facts(&facts))?;
        self.metrics
            .record_pod_sampling(metrics.pods_sampled, metrics.pods_failed);

        if cancel.is_cancelled() {
            return Err(fail(AnalyzerError::Cancelled)
                .with_facts(&facts)
                .with_metrics(&metrics));
        }

        let prompt = self.prompts.prompt_for(workload, &template);

        let gateway_start = Instant::now();
        let analysis = until_cancelled(cancel, self.gateway.request_analysis(&prompt, &self.credentials)).await;
        self.metrics
            .observe_gateway_latency(gateway_start.elapsed().as_secs_f64());
        let analysis = analysis.map_err(|e| fail(e).with_facts(&facts).with_metrics(&metrics))?;

        info!(workload = %workload, "Merging report");
        Ok(ReportMerger::merge(workload.clone(), facts, metrics, analysis))
    }
}

/// Race a stage against cancellation
async fn until_cancelled<T, F>(cancel: &CancellationToken, stage: F) -> Result<T, AnalyzerError>
where
    F: Future<Output = Result<T, AnalyzerError>>,
{
    if cancel.is_cancelled() {
        return Err(AnalyzerError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AnalyzerError::Cancelled),
        result = stage => result,
    }
}

/// Builder for the analysis pipeline
pub struct AnalyzerBuilder {
    reader: Option<Arc<dyn ClusterReader>>,
    credentials: Option<Credentials>,
    gateway: GatewayConfig,
    aggregator: AggregatorConfig,
    summary: SummaryConfig,
    instance: String,
    health: Option<HealthRegistry>,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            reader: None,
            credentials: None,
            gateway: GatewayConfig::default(),
            aggregator: AggregatorConfig::default(),
            summary: SummaryConfig::default(),
            instance: "workload-analyzer".to_string(),
            health: None,
        }
    }

    /// Set the cluster reader
    pub fn reader(mut self, reader: Arc<dyn ClusterReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn gateway_config(mut self, config: GatewayConfig) -> Self {
        self.gateway = config;
        self
    }

    pub fn aggregator_config(mut self, config: AggregatorConfig) -> Self {
        self.aggregator = config;
        self
    }

    pub fn summary_config(mut self, config: SummaryConfig) -> Self {
        self.summary = config;
        self
    }

    /// Name used in structured log events
    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    /// Report dependency health from analysis outcomes
    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn build(self) -> Result<Analyzer, AnalyzerError> {
        let reader = self
            .reader
            .ok_or_else(|| AnalyzerError::Config("cluster reader is required".to_string()))?;
        let credentials = self
            .credentials
            .ok_or_else(|| AnalyzerError::Config("inference API key is required".to_string()))?;

        if credentials.api_key().trim().is_empty() {
            return Err(AnalyzerError::Config("inference API key is empty".to_string()));
        }

        Ok(Analyzer {
            locator: WorkloadLocator::new(Arc::clone(&reader)),
            aggregator: MetricsAggregator::new(reader, self.aggregator),
            prompts: PromptBuilder::new(self.summary),
            gateway: AiGateway::new(self.gateway)?,
            credentials,
            metrics: AnalyzerMetrics::new(),
            logger: StructuredLogger::new(self.instance),
            health: self.health,
        })
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
