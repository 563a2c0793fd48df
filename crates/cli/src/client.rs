//! API client for a running workload-analyzer service

use analyzer_lib::{Report, StaticFacts, WorkloadRef};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Error reported by the service for a failed analysis
#[derive(Debug, Error)]
#[error("{error} ({code}): {details}")]
pub struct ServerError {
    pub status: u16,
    pub error: String,
    pub code: String,
    pub details: String,
    pub facts: Option<StaticFacts>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
    #[serde(default)]
    details: String,
    #[serde(default)]
    facts: Option<StaticFacts>,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    namespace: &'a str,
    workload_type: &'a str,
    workload_name: &'a str,
}

/// HTTP client for the analyzer service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        // Inference calls can take a while; leave headroom over the service timeout
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid server URL")?;

        Ok(Self { client, base_url })
    }

    /// Ask the service to analyze a workload
    pub async fn analyze(&self, workload: &WorkloadRef) -> Result<Report> {
        let url = self
            .base_url
            .join("api/v1/analyze")
            .context("Invalid path")?;

        let request = AnalyzeRequest {
            namespace: &workload.namespace,
            workload_type: workload.kind.as_str(),
            workload_name: &workload.name,
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorBody>(&body) {
                Ok(error) => ServerError {
                    status: status.as_u16(),
                    error: error.error,
                    code: error.code,
                    details: error.details,
                    facts: error.facts,
                }
                .into(),
                Err(_) => anyhow::anyhow!("API error ({}): {}", status, body),
            });
        }

        response.json().await.context("Failed to parse report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_lib::WorkloadKind;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn workload() -> WorkloadRef {
        WorkloadRef::new("shop", WorkloadKind::StatefulSet, "ledger")
    }

    #[tokio::test]
    async fn test_analyze_decodes_report() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/analyze")
            .match_body(Matcher::Json(json!({
                "namespace": "shop",
                "workload_type": "StatefulSet",
                "workload_name": "ledger"
            })))
            .with_status(200)
            .with_body(
                json!({
                    "workload": {"namespace": "shop", "kind": "StatefulSet", "name": "ledger"},
                    "facts": {"main_container": "ledger", "container_count": 1, "priority_class_name": null, "desired_replicas": 3},
                    "metrics": {
                        "replica_count": "3",
                        "avg_cpu_millicores": 120,
                        "avg_memory_bytes": 268435456,
                        "efficiency": {"status": "rated", "level": "Medium", "percent": 62.5},
                        "pods_sampled": 3,
                        "pods_failed": 0
                    },
                    "analysis": {"narrative": "ok", "reliability_risk": "Low"},
                    "generated_at": "2024-05-01T12:00:00Z"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let report = client.analyze(&workload()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(report.replica_count(), "3");
        assert_eq!(report.efficiency_percent(), Some(62.5));
        assert_eq!(report.analysis().narrative, "ok");
    }

    #[tokio::test]
    async fn test_analyze_surfaces_server_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/analyze")
            .with_status(404)
            .with_body(
                json!({
                    "error": "workload not found",
                    "code": "not_found",
                    "details": "workload not found: StatefulSet/ledger in shop"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.analyze(&workload()).await.unwrap_err();
        let server_error = err.downcast_ref::<ServerError>().unwrap();

        assert_eq!(server_error.status, 404);
        assert_eq!(server_error.code, "not_found");
        assert!(server_error.facts.is_none());
    }

    #[tokio::test]
    async fn test_analyze_plain_error_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/analyze")
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.analyze(&workload()).await.unwrap_err();

        assert!(err.to_string().contains("oops"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
