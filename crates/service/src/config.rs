//! Service configuration

use analyzer_lib::gateway::{GatewayConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use analyzer_lib::metrics::AggregatorConfig;
use analyzer_lib::prompt::SummaryConfig;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Service configuration, read from `ANALYZER_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance")]
    pub instance: String,

    /// HTTP port for the analysis, health and metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Chat-completions endpoint
    #[serde(default = "default_ai_endpoint")]
    pub ai_endpoint: String,

    #[serde(default = "default_ai_model")]
    pub ai_model: String,

    /// Bearer key for the inference endpoint (required)
    #[serde(default)]
    pub ai_api_key: Option<String>,

    /// Inference request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent pod usage fetches
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Indentation depth of the container list in rendered specs
    #[serde(default = "default_container_indent")]
    pub container_indent: usize,
}

fn default_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "workload-analyzer".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_ai_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_ai_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_fetch_concurrency() -> usize {
    8
}

fn default_container_indent() -> usize {
    6
}

impl ServiceConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit variable map instead of the process environment
    pub fn load_from(vars: Option<config::Map<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("ANALYZER")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .context("Failed to read ANALYZER_* environment")?;

        let config: ServiceConfig = config
            .try_deserialize()
            .context("Invalid ANALYZER_* configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api_key().is_none() {
            bail!("ANALYZER_AI_API_KEY must be set");
        }
        if self.fetch_concurrency == 0 {
            bail!("ANALYZER_FETCH_CONCURRENCY must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            bail!("ANALYZER_REQUEST_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }

    /// Non-empty API key, if configured
    pub fn api_key(&self) -> Option<&str> {
        self.ai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            endpoint: self.ai_endpoint.clone(),
            model: self.ai_model.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            ..Default::default()
        }
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            fetch_concurrency: self.fetch_concurrency,
            ..Default::default()
        }
    }

    pub fn summary_config(&self) -> SummaryConfig {
        SummaryConfig {
            container_indent: self.container_indent,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_with_api_key() {
        let config = ServiceConfig::load_from(vars(&[("ANALYZER_AI_API_KEY", "sk-test")])).unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.ai_endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.ai_model, DEFAULT_MODEL);
        assert_eq!(config.api_key(), Some("sk-test"));
        assert_eq!(config.aggregator_config().fetch_concurrency, 8);
        assert_eq!(config.summary_config().container_indent, 6);
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::load_from(vars(&[
            ("ANALYZER_AI_API_KEY", "sk-test"),
            ("ANALYZER_API_PORT", "9000"),
            ("ANALYZER_AI_MODEL", "gpt-4o-mini"),
            ("ANALYZER_REQUEST_TIMEOUT_SECS", "15"),
            ("ANALYZER_FETCH_CONCURRENCY", "2"),
            ("ANALYZER_CONTAINER_INDENT", "4"),
        ]))
        .unwrap();

        assert_eq!(config.api_port, 9000);
        assert_eq!(config.gateway_config().model, "gpt-4o-mini");
        assert_eq!(config.gateway_config().timeout, Duration::from_secs(15));
        assert_eq!(config.aggregator_config().fetch_concurrency, 2);
        assert_eq!(config.summary_config().container_indent, 4);
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let err = ServiceConfig::load_from(vars(&[])).unwrap_err();
        assert!(err.to_string().contains("ANALYZER_AI_API_KEY"));

        assert!(ServiceConfig::load_from(vars(&[("ANALYZER_AI_API_KEY", "  ")])).is_err());
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let result = ServiceConfig::load_from(vars(&[
            ("ANALYZER_AI_API_KEY", "sk-test"),
            ("ANALYZER_FETCH_CONCURRENCY", "0"),
        ]));
        assert!(result.is_err());
    }
}
