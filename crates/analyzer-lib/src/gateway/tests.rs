use super::*;
use crate::models::ReliabilityRisk;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

const PATH: &str = "/v1/chat/completions";

fn gateway(server: &ServerGuard) -> AiGateway {
    AiGateway::new(GatewayConfig {
        endpoint: format!("{}{}", server.url(), PATH),
        timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap()
}

fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
    .to_string()
}

#[tokio::test]
async fn test_request_analysis_success() {
    let mut server = Server::new_async().await;
    let content = json!({
        "analysis": "Requests are well sized.",
        "reliability_risk": "Medium",
        "opportunities": ["Lower memory limit"],
        "cautions": [],
        "blockers": null,
        "recommendations": ["Add a readiness probe"]
    })
    .to_string();

    let mock = server
        .mock("POST", PATH)
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-3.5-turbo",
            "response_format": {"type": "json_object"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(&content))
        .create_async()
        .await;

    let result = gateway(&server)
        .request_analysis("analyze this", &Credentials::new("sk-test"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.narrative, "Requests are well sized.");
    assert_eq!(result.reliability_risk, ReliabilityRisk::Medium);
    assert_eq!(result.opportunities, vec!["Lower memory limit"]);
    assert!(result.blockers.is_empty());
    assert_eq!(result.recommendations, vec!["Add a readiness probe"]);
}

#[tokio::test]
async fn test_request_sends_system_and_user_messages() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_body(Matcher::PartialJson(json!({
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": "the prompt"}
            ]
        })))
        .with_status(200)
        .with_body(completion("{\"analysis\": \"ok\"}"))
        .create_async()
        .await;

    gateway(&server)
        .request_analysis("the prompt", &Credentials::new("k"))
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_success_status_is_upstream_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(429)
        .with_body("rate limited")
        .create_async()
        .await;

    let err = gateway(&server)
        .request_analysis("p", &Credentials::new("k"))
        .await
        .unwrap_err();

    match err {
        AnalyzerError::UpstreamError { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_object_is_upstream_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(json!({"error": {"message": "model overloaded"}}).to_string())
        .create_async()
        .await;

    let err = gateway(&server)
        .request_analysis("p", &Credentials::new("k"))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalyzerError::UpstreamError { body, .. } if body == "model overloaded"));
}

#[tokio::test]
async fn test_invalid_envelope_is_upstream_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    let err = gateway(&server)
        .request_analysis("p", &Credentials::new("k"))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalyzerError::UpstreamError { status: 200, .. }));
}

#[tokio::test]
async fn test_zero_choices_is_empty_choices() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(json!({"choices": []}).to_string())
        .create_async()
        .await;

    let err = gateway(&server)
        .request_analysis("p", &Credentials::new("k"))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalyzerError::EmptyChoices));
}

#[tokio::test]
async fn test_prose_without_object_is_malformed() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(completion("I cannot analyze this workload."))
        .create_async()
        .await;

    let err = gateway(&server)
        .request_analysis("p", &Credentials::new("k"))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalyzerError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_wrong_shape_is_schema_mismatch() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(completion("{\"recommendations\": 42}"))
        .create_async()
        .await;

    let err = gateway(&server)
        .request_analysis("p", &Credentials::new("k"))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalyzerError::SchemaMismatch { .. }));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let gateway = AiGateway::new(GatewayConfig {
        endpoint: "http://127.0.0.1:1/v1/chat/completions".to_string(),
        timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .unwrap();

    let err = gateway
        .request_analysis("p", &Credentials::new("k"))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalyzerError::Transport(_)));
}

#[test]
fn test_credentials_debug_is_redacted() {
    let debug = format!("{:?}", Credentials::new("sk-secret"));
    assert!(!debug.contains("sk-secret"));
}
