//! Analyzer library for workload efficiency reports
//!
//! This crate provides the analysis pipeline:
//! - Workload resolution against the Kubernetes API
//! - Per-pod usage aggregation and efficiency scoring
//! - Container summary and prompt construction
//! - Inference gateway with response validation
//! - Report assembly, health checks and observability

pub mod cancel;
pub mod error;
pub mod gateway;
pub mod health;
pub mod locator;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod prompt;
pub mod report;

pub use cancel::CancellationToken;
pub use error::AnalyzerError;
pub use gateway::{AiGateway, Credentials, GatewayConfig};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{AnalyzerMetrics, StructuredLogger};
pub use pipeline::{AnalyzeFailure, Analyzer, AnalyzerBuilder};
pub use report::{Report, ReportMerger};
