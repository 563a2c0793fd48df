//! Workload Analyzer - efficiency and reliability reports over HTTP
//!
//! Runs in-cluster, reads workloads and pod usage through the Kubernetes
//! API and asks an inference endpoint for the narrative assessment.

use analyzer_lib::{
    gateway::Credentials,
    health::{components, HealthRegistry},
    locator::KubeClusterReader,
    observability::StructuredLogger,
    Analyzer,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const ANALYZER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting workload-analyzer");

    let config = config::ServiceConfig::load()?;
    info!(
        instance = %config.instance,
        endpoint = %config.ai_endpoint,
        model = %config.ai_model,
        "Analyzer configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::CLUSTER).await;
    health_registry.register(components::GATEWAY).await;

    let reader = KubeClusterReader::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let api_key = config.api_key().unwrap_or_default();
    let analyzer = Analyzer::builder()
        .reader(Arc::new(reader))
        .credentials(Credentials::new(api_key))
        .gateway_config(config.gateway_config())
        .aggregator_config(config.aggregator_config())
        .summary_config(config.summary_config())
        .instance(config.instance.clone())
        .health(health_registry.clone())
        .build()
        .context("Failed to build analysis pipeline")?;

    let logger = StructuredLogger::new(&config.instance);
    logger.log_startup(ANALYZER_VERSION, &config.ai_model);

    let app_state = Arc::new(api::AppState::new(analyzer, health_registry.clone()));

    health_registry.set_ready(true).await;

    api::serve(config.api_port, app_state, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
