//! `wla analyze` command

use crate::client::ApiClient;
use crate::config;
use crate::output::{self, OutputFormat, Theme};
use analyzer_lib::{
    gateway::{Credentials, GatewayConfig},
    locator::KubeClusterReader,
    AnalyzeFailure, Analyzer, CancellationToken, Report, WorkloadRef,
};
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Resolved options for one analysis
pub struct AnalyzeOptions {
    pub target: String,
    pub namespace: String,
    pub server: Option<String>,
    pub kubeconfig: Option<String>,
    pub context: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub format: OutputFormat,
    pub theme: Theme,
}

pub async fn run(opts: AnalyzeOptions) -> Result<()> {
    let workload = WorkloadRef::parse_target(&opts.namespace, &opts.target)?;

    let report = match opts.server.as_deref() {
        Some(server) => {
            debug!(server, "Analyzing through service");
            ApiClient::new(server)?.analyze(&workload).await?
        }
        None => analyze_locally(&opts, &workload).await?,
    };

    print_report(&report, opts.format, &opts.theme)
}

async fn analyze_locally(opts: &AnalyzeOptions, workload: &WorkloadRef) -> Result<Report> {
    let api_key = match opts.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => bail!("An API key is required: pass --api-key or set OPENAI_API_KEY"),
    };

    let reader = match config::kubeconfig_path(opts.kubeconfig.as_deref()) {
        Some(path) => {
            debug!(path = %path.display(), "Using kubeconfig");
            KubeClusterReader::from_kubeconfig(&path, opts.context.as_deref()).await?
        }
        None => KubeClusterReader::try_default().await?,
    };

    let mut gateway = GatewayConfig::default();
    if let Some(model) = &opts.model {
        gateway.model = model.clone();
    }
    if let Some(endpoint) = &opts.endpoint {
        gateway.endpoint = endpoint.clone();
    }

    let analyzer = Analyzer::builder()
        .reader(Arc::new(reader))
        .credentials(Credentials::new(api_key))
        .gateway_config(gateway)
        .instance("wla")
        .build()
        .context("Failed to build analysis pipeline")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling analysis");
            on_interrupt.cancel();
        }
    });

    let result = analyzer.analyze(workload, &cancel).await;
    interrupt.abort();

    result.map_err(|failure| report_failure(failure, &opts.theme))
}

/// Failure whose details were already written to stderr
#[derive(Debug, Error)]
#[error("analysis of {workload} failed: {code}")]
pub struct ReportedFailure {
    pub workload: WorkloadRef,
    pub code: &'static str,
}

fn report_failure(failure: AnalyzeFailure, theme: &Theme) -> anyhow::Error {
    eprint!("{}", output::render_failure(&failure, theme));
    ReportedFailure {
        code: failure.error.code(),
        workload: failure.workload,
    }
    .into()
}

fn print_report(report: &Report, format: OutputFormat, theme: &Theme) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Table => {
            print!("{}", output::render_report(report, theme));
        }
    }
    Ok(())
}
