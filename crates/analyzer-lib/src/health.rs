//! Dependency health for the analyzer service
//!
//! Tracks the two external dependencies an analysis needs, the cluster API
//! and the inference endpoint, from the outcome of real requests.

use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Recent requests failed but the dependency answered
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|health| health.status)
            .max_by_key(|status| match status {
                ComponentStatus::Healthy => 0,
                ComponentStatus::Degraded => 1,
                ComponentStatus::Unhealthy => 2,
            })
            .unwrap_or(ComponentStatus::Healthy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const CLUSTER: &str = "cluster";
    pub const GATEWAY: &str = "gateway";
}

/// Shared registry of dependency health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Record the outcome of a completed analysis
    pub async fn record_success(&self) {
        self.set_healthy(components::CLUSTER).await;
        self.set_healthy(components::GATEWAY).await;
    }

    /// Record a failed analysis against the dependency that caused it
    ///
    /// Caller mistakes (unknown workload, bad kind, cancellation) say
    /// nothing about dependency health and are ignored. Unreachable
    /// dependencies are unhealthy; dependencies that answered with an
    /// error are degraded.
    pub async fn record_failure(&self, error: &AnalyzerError) {
        match error {
            AnalyzerError::Cluster(message) => {
                self.set_unhealthy(components::CLUSTER, message.clone()).await;
            }
            AnalyzerError::PermissionDenied { message, .. } => {
                self.set_degraded(components::CLUSTER, message.clone()).await;
            }
            AnalyzerError::Transport(message) => {
                self.set_unhealthy(components::GATEWAY, message.clone()).await;
            }
            e if e.is_gateway_error() => {
                self.set_degraded(components::GATEWAY, e.to_string()).await;
            }
            _ => {}
        }
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Ready once started, unless a dependency is unreachable
    pub async fn readiness(&self) -> ReadinessResponse {
        if !*self.ready.read().await {
            return ReadinessResponse {
                ready: false,
                reason: Some("Analyzer not yet initialized".to_string()),
            };
        }

        let health = self.health().await;
        let unreachable: Vec<&str> = health
            .components
            .iter()
            .filter(|(_, h)| h.status == ComponentStatus::Unhealthy)
            .map(|(name, _)| name.as_str())
            .collect();

        if unreachable.is_empty() {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            let mut unreachable = unreachable;
            unreachable.sort_unstable();
            ReadinessResponse {
                ready: false,
                reason: Some(format!("Unreachable: {}", unreachable.join(", "))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry() -> HealthRegistry {
        let registry = HealthRegistry::new();
        registry.register(components::CLUSTER).await;
        registry.register(components::GATEWAY).await;
        registry
    }

    #[tokio::test]
    async fn test_initial_state_is_healthy_but_not_ready() {
        let registry = registry().await;

        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
        assert!(!registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_upstream_error_degrades_gateway() {
        let registry = registry().await;
        registry
            .record_failure(&AnalyzerError::UpstreamError {
                status: 500,
                body: "boom".to_string(),
            })
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(health.components[components::GATEWAY].status, ComponentStatus::Degraded);
        assert_eq!(health.components[components::CLUSTER].status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_unreachable_cluster_blocks_readiness() {
        let registry = registry().await;
        registry.set_ready(true).await;
        registry
            .record_failure(&AnalyzerError::Cluster("connection refused".to_string()))
            .await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Unreachable: cluster"));
    }

    #[tokio::test]
    async fn test_caller_errors_do_not_change_health() {
        let registry = registry().await;
        registry.record_failure(&AnalyzerError::NotFound("web".to_string())).await;
        registry.record_failure(&AnalyzerError::Cancelled).await;

        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_success_restores_health() {
        let registry = registry().await;
        registry.set_ready(true).await;
        registry.record_failure(&AnalyzerError::Transport("timeout".to_string())).await;
        assert!(!registry.readiness().await.ready);

        registry.record_success().await;
        assert!(registry.readiness().await.ready);
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }
}
