//! Inference gateway
//!
//! Sends the analysis prompt to an OpenAI-compatible chat-completions
//! endpoint and validates the response down to a typed `AnalysisResult`.
//! Validation order is fixed: HTTP status, envelope, choices, JSON span,
//! schema.

mod extract;

#[cfg(test)]
mod tests;

pub use extract::{decode_analysis, extract_json_object, parse_analysis};

use crate::error::AnalyzerError;
use crate::models::AnalysisResult;
use crate::prompt::SYSTEM_PROMPT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Configuration for the inference gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Chat-completions endpoint URL
    pub endpoint: String,
    /// Model name sent with every request
    pub model: String,
    /// Sampling temperature (default: 0.1)
    pub temperature: f64,
    /// Whole-request timeout (default: 60 seconds)
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Bearer credentials for the inference endpoint
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("api_key", &"<redacted>").finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// HTTP client for the inference endpoint
#[derive(Clone)]
pub struct AiGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl AiGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, AnalyzerError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalyzerError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Send one analysis request, no retries
    pub async fn request_analysis(
        &self,
        prompt: &str,
        credentials: &Credentials,
    ) -> Result<AnalysisResult, AnalyzerError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            response_format: ResponseFormat { kind: "json_object" },
        };

        debug!(
            endpoint = %self.config.endpoint,
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "Sending analysis request"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(credentials.api_key())
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalyzerError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalyzerError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Inference API returned an error status");
            return Err(AnalyzerError::UpstreamError {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "Failed to decode inference response envelope");
            AnalyzerError::UpstreamError {
                status: status.as_u16(),
                body: format!("invalid response envelope ({}): {}", e, body),
            }
        })?;

        if let Some(error) = envelope.error {
            return Err(AnalyzerError::UpstreamError {
                status: status.as_u16(),
                body: error.message,
            });
        }

        let content = envelope
            .choices
            .into_iter()
            .next()
            .ok_or(AnalyzerError::EmptyChoices)?
            .message
            .content
            .unwrap_or_default();

        let analysis = parse_analysis(&content)?;

        info!(
            model = %self.config.model,
            reliability_risk = %analysis.reliability_risk,
            recommendations = analysis.recommendations.len(),
            "Received analysis"
        );

        Ok(analysis)
    }
}
