//! Error taxonomy for the analysis pipeline

use thiserror::Error;

/// Errors raised by the analysis pipeline
///
/// Metrics problems are not represented here: they degrade the report to
/// an explicit `NotAvailable` efficiency with a reason instead of aborting.
#[derive(Debug, Clone, Error)]
pub enum AnalyzerError {
    #[error("workload not found: {0}")]
    NotFound(String),

    #[error("permission denied reading {resource}: {message}")]
    PermissionDenied { resource: String, message: String },

    #[error("unsupported workload type: {0}")]
    UnsupportedWorkloadType(String),

    #[error("invalid workload target '{0}', expected <kind>/<name>")]
    InvalidTarget(String),

    #[error("cluster API request failed: {0}")]
    Cluster(String),

    #[error("inference API returned status {status}: {body}")]
    UpstreamError { status: u16, body: String },

    #[error("inference API returned no choices")]
    EmptyChoices,

    #[error("inference response is not a JSON object: {content}")]
    MalformedResponse { content: String },

    #[error("inference response does not match the analysis schema ({reason}): {content}")]
    SchemaMismatch { content: String, reason: String },

    #[error("inference request failed: {0}")]
    Transport(String),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AnalyzerError {
    /// Stable machine-readable code for API responses and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            AnalyzerError::NotFound(_) => "not_found",
            AnalyzerError::PermissionDenied { .. } => "permission_denied",
            AnalyzerError::UnsupportedWorkloadType(_) => "unsupported_workload_type",
            AnalyzerError::InvalidTarget(_) => "invalid_target",
            AnalyzerError::Cluster(_) => "cluster_error",
            AnalyzerError::UpstreamError { .. } => "upstream_error",
            AnalyzerError::EmptyChoices => "empty_choices",
            AnalyzerError::MalformedResponse { .. } => "malformed_response",
            AnalyzerError::SchemaMismatch { .. } => "schema_mismatch",
            AnalyzerError::Transport(_) => "transport_error",
            AnalyzerError::Cancelled => "cancelled",
            AnalyzerError::Config(_) => "config_error",
        }
    }

    /// Whether the error came from the inference gateway stage
    pub fn is_gateway_error(&self) -> bool {
        matches!(
            self,
            AnalyzerError::UpstreamError { .. }
                | AnalyzerError::EmptyChoices
                | AnalyzerError::MalformedResponse { .. }
                | AnalyzerError::SchemaMismatch { .. }
                | AnalyzerError::Transport(_)
        )
    }
}
