//! HTTP API for workload analysis, health checks and Prometheus metrics

use analyzer_lib::{
    health::{ComponentStatus, HealthRegistry},
    AggregateMetrics, AnalyzeFailure, Analyzer, AnalyzerError, AnalyzerMetrics, CancellationToken,
    StaticFacts, WorkloadKind, WorkloadRef,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Analyzer,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(analyzer: Analyzer, health_registry: HealthRegistry) -> Self {
        Self {
            analyzer,
            health_registry,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub namespace: String,
    pub workload_type: String,
    pub workload_name: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facts: Option<StaticFacts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<AggregateMetrics>,
}

/// Error response for a failed analysis
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn from_error(error: &AnalyzerError) -> Self {
        let (status, summary) = match error {
            AnalyzerError::NotFound(_) => (StatusCode::NOT_FOUND, "workload not found"),
            AnalyzerError::PermissionDenied { .. } => (StatusCode::FORBIDDEN, "permission denied"),
            AnalyzerError::UnsupportedWorkloadType(_) | AnalyzerError::InvalidTarget(_) => {
                (StatusCode::BAD_REQUEST, "invalid workload reference")
            }
            AnalyzerError::Cluster(_) => (StatusCode::BAD_GATEWAY, "cluster API request failed"),
            e if e.is_gateway_error() => (StatusCode::BAD_GATEWAY, "AI analysis failed"),
            AnalyzerError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "analysis cancelled"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "analysis failed"),
        };

        Self {
            status,
            body: ErrorBody {
                error: summary.to_string(),
                code: error.code(),
                details: error.to_string(),
                facts: None,
                metrics: None,
            },
        }
    }
}

impl From<AnalyzeFailure> for ApiError {
    fn from(failure: AnalyzeFailure) -> Self {
        let mut api_error = ApiError::from_error(&failure.error);
        api_error.body.facts = failure.facts;
        api_error.body.metrics = failure.metrics;
        api_error
    }
}

impl From<AnalyzerError> for ApiError {
    fn from(error: AnalyzerError) -> Self {
        ApiError::from_error(&error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Run the pipeline for one workload
async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: WorkloadKind = request.workload_type.parse()?;
    if request.workload_name.trim().is_empty() {
        return Err(AnalyzerError::InvalidTarget(format!("{}/", request.workload_type)).into());
    }
    let workload = WorkloadRef::new(request.namespace, kind, request.workload_name);

    info!(workload = %workload, "Analysis requested");

    // The pipeline runs in its own task so a dropped connection cancels it
    // through the token instead of dropping it mid-stage
    let cancel = CancellationToken::new();
    let _guard = CancelOnDrop(cancel.clone());
    let (tx, rx) = oneshot::channel();
    let analyzer = state.analyzer.clone();
    tokio::spawn(async move {
        let _ = tx.send(analyzer.analyze(&workload, &cancel).await);
    });

    let report = rx
        .await
        .map_err(|_| ApiError::from_error(&AnalyzerError::Cancelled))??;
    Ok(Json(report))
}

struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    match AnalyzerMetrics::new().render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/analyze", post(analyze))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
