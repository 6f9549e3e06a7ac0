//! HTTP API through the full router stack

use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use codetutor::config::{Config, FeedbackMode};
use codetutor::llm::{LlmClient, MockLlmClient};
use codetutor::server::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

struct UnreachableClient;

#[async_trait]
impl LlmClient for UnreachableClient {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        bail!("Ollama is not reachable at http://localhost:11434")
    }

    async fn health(&self) -> Result<()> {
        bail!("Ollama is not reachable at http://localhost:11434")
    }
}

async fn send(state: Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
    let router = create_router(state).unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_reflects_startup_check() {
    let state = Arc::new(AppState::new(Config::default(), Arc::new(MockLlmClient::new())));
    let (_, body) = send(state.clone(), Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(body["model_loaded"], false);

    assert!(state.check_model().await);
    let (status, body) = send(state, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], true);
}

#[tokio::test]
async fn test_unreachable_model_still_serves_requests() {
    let state = Arc::new(AppState::new(Config::default(), Arc::new(UnreachableClient)));
    assert!(!state.check_model().await);

    let (status, _) = send(state.clone(), Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        state,
        post_json("/analyze-code", json!({"code": "x = 1", "language": "python"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Failed to analyze code:"));
    assert!(detail.contains("not reachable"));
}

#[tokio::test]
async fn test_analyze_code_full_request() {
    let state = Arc::new(AppState::new(Config::default(), Arc::new(MockLlmClient::new())));
    let (status, body) = send(
        state,
        post_json(
            "/analyze-code",
            json!({
                "code": "function add(a, b) {\n  var total = a + b\n  return total\n}",
                "language": "javascript",
                "assignment_context": "Add two numbers",
                "feedback_type": "best_practices",
                "student_level": "intermediate"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // 82 from the model, -2 for one `var`
    assert_eq!(body["overall_score"], 80.0);
    let suggestions = body["specific_suggestions"].as_array().unwrap();
    assert_eq!(suggestions.last().unwrap()["issue_type"], "static_analysis");
    assert!(body["generated_at"].is_string());
}

#[tokio::test]
async fn test_analyze_code_rejects_unknown_language() {
    let state = Arc::new(AppState::new(Config::default(), Arc::new(MockLlmClient::new())));
    let (status, _) = send(
        state,
        post_json("/analyze-code", json!({"code": "x", "language": "cobol"})),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_feedback_in_demo_mode() {
    let mut config = Config::default();
    config.feedback.mode = FeedbackMode::Demo;
    let state = Arc::new(AppState::new(config, Arc::new(UnreachableClient)));

    let (status, body) = send(
        state,
        post_json("/feedback", json!({"code": "print(1)", "student_level": "advanced"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "demo");
    assert_eq!(body["student_level"], "advanced");
    assert!(body["improved_code"].as_str().unwrap().contains("print(1)"));
}

#[tokio::test]
async fn test_feedback_uses_configured_default_level() {
    let mut config = Config::default();
    config.feedback.default_level = codetutor::level::StudentLevel::Intermediate;
    let state = Arc::new(AppState::new(config, Arc::new(MockLlmClient::new())));

    let (status, body) = send(state, post_json("/feedback", json!({"code": "x = [1, 2]"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student_level"], "intermediate");
    assert_eq!(body["source"], "model");
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let mut config = Config::default();
    config.server.cors_origins = vec!["http://class.example".to_string()];
    let state = Arc::new(AppState::new(config, Arc::new(MockLlmClient::new())));
    let router = create_router(state).unwrap();

    let response = router
        .oneshot(
            Request::get("/supported-languages")
                .header(header::ORIGIN, "http://class.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://class.example"
    );
}
