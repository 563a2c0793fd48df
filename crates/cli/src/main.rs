//! Workload Analyzer CLI
//!
//! Analyzes a Kubernetes workload's resource efficiency and reliability,
//! either directly against the cluster or through a running analyzer service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::analyze::{self, AnalyzeOptions, ReportedFailure};
use output::Theme;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Workload Analyzer CLI
#[derive(Parser)]
#[command(name = "wla")]
#[command(author, version, about = "Workload efficiency and reliability analyzer", long_about = None)]
pub struct Cli {
    /// Analyzer service URL; analyzes locally when not set (env: WLA_SERVER_URL)
    #[arg(long, env = "WLA_SERVER_URL")]
    pub server: Option<String>,

    /// Path to kubeconfig file (uses default if not specified)
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a workload (e.g. deploy/web, sts/db, ds/agent)
    Analyze {
        /// Workload as kind/name
        target: String,

        /// Namespace of the workload (default: "default")
        #[arg(long, short)]
        namespace: Option<String>,

        /// API key for the inference endpoint
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Chat model to use
        #[arg(long)]
        model: Option<String>,

        /// Chat-completions endpoint URL
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.downcast_ref::<ReportedFailure>().is_none() {
                output::print_error(&format!("{:#}", e));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let defaults = config::Config::load()?;
    let theme = Theme::detect(cli.no_color);

    match cli.command {
        Commands::Analyze {
            target,
            namespace,
            api_key,
            model,
            endpoint,
        } => {
            let opts = AnalyzeOptions {
                target,
                namespace: namespace
                    .or(defaults.default_namespace)
                    .unwrap_or_else(|| "default".to_string()),
                server: cli.server.or(defaults.server_url),
                kubeconfig: cli.kubeconfig,
                context: cli.context,
                api_key,
                model: model.or(defaults.model),
                endpoint,
                format: cli.format,
                theme,
            };
            analyze::run(opts).await
        }
    }
}
