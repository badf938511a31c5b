//! HTTP adapter against a mock evaluation service.

use std::sync::Arc;

use council_core::{BackendConfig, Stage, Stage1Request};
use council_pipeline::{HttpStageClient, PipelineOrchestrator, StageClient};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpStageClient {
    let config = BackendConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        ..BackendConfig::default()
    };
    HttpStageClient::new(&config).unwrap()
}

fn question(text: &str) -> Stage1Request {
    Stage1Request {
        question: text.to_string(),
    }
}

#[tokio::test]
async fn test_server_error_is_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/stage1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server).collect(&question("q")).await.unwrap_err();
    assert_eq!(err.stage(), Stage::Collect);
    assert!(err.is_transport());
    assert!(err.reason().contains("500"));
}

#[tokio::test]
async fn test_malformed_body_is_validation_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/evaluate/stage1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).collect(&question("q")).await.unwrap_err();
    assert_eq!(err.stage(), Stage::Collect);
    assert!(!err.is_transport());
    assert!(err.reason().starts_with("malformed response body"));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_failure() {
    let config = BackendConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 2,
        ..BackendConfig::default()
    };
    let client = HttpStageClient::new(&config).unwrap();

    let err = client.collect(&question("q")).await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "ok", "service": "LLM Council API"})),
        )
        .mount(&server)
        .await;

    let health = client_for(&server).health().await.unwrap();
    assert!(health.is_ok());
    assert_eq!(health.service, "LLM Council API");
}

#[tokio::test]
async fn test_full_run_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/evaluate/stage1"))
        .and(body_json(json!({"question": "Is the sky blue?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stage1": [
                {"model": "openai/gpt-4o", "response": "Yes."},
                {"model": "meta/llama-3", "response": null, "error": "rate limited"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/evaluate/stage2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stage2": [{
                "model": "openai/gpt-4o",
                "evaluation": {
                    "Response A": {
                        "toxicity": {"score": 0, "reasoning": "none"},
                        "bias": {"score": 1, "reasoning": "slight"},
                        "hallucination": {"score": 0, "reasoning": "accurate"},
                        "political_leaning": {"score": 0, "reasoning": "neutral"}
                    }
                },
                "raw_response": "Response A is accurate."
            }],
            "metadata": {"label_to_model": {"Response A": "openai/gpt-4o"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/evaluate/stage3"))
        .and(body_json(json!({
            "stage2_results": [{
                "model": "openai/gpt-4o",
                "evaluation": {
                    "Response A": {
                        "toxicity": {"score": 0.0, "reasoning": "none"},
                        "bias": {"score": 1.0, "reasoning": "slight"},
                        "hallucination": {"score": 0.0, "reasoning": "accurate"},
                        "political_leaning": {"score": 0.0, "reasoning": "neutral"}
                    }
                },
                "raw_response": "Response A is accurate."
            }],
            "label_to_model": {"Response A": "openai/gpt-4o"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stage3": [{
                "model": "openai/gpt-4o",
                "average_score": 0.3,
                "scores": {
                    "toxicity": 0.0,
                    "bias": 1.0,
                    "hallucination": 0.0,
                    "political_leaning": 0.0
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = PipelineOrchestrator::new(Arc::new(client_for(&server)));
    let run = orchestrator.run("Is the sky blue?").await.unwrap();

    let stage1 = run.stage1().unwrap();
    assert_eq!(stage1.len(), 2);
    assert!(stage1[1].is_error());
    assert_eq!(run.revealed().unwrap()[0].raw_response, "**gpt-4o** is accurate.");
    assert_eq!(run.scoreboard().unwrap()[0].model, "openai/gpt-4o");
}
