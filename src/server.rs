//! HTTP API: scored assessments and tutoring feedback over JSON.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::assessment::{Assessment, AssessmentService, CodeSubmission, FeedbackType};
use crate::config::Config;
use crate::detector::Language;
use crate::feedback::{ComprehensiveFeedback, Tutor};
use crate::level::StudentLevel;
use crate::llm::LlmClient;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedLanguagesResponse {
    pub languages: Vec<Language>,
    pub feedback_types: Vec<FeedbackType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub code: String,
    #[serde(default)]
    pub student_level: Option<StudentLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared by every handler.
pub struct AppState {
    pub config: Config,
    pub client: Arc<dyn LlmClient>,
    pub tutor: Tutor,
    pub assessor: AssessmentService,
    /// Set by the startup health check.
    pub model_loaded: AtomicBool,
}

impl AppState {
    pub fn new(config: Config, client: Arc<dyn LlmClient>) -> Self {
        let tutor = Tutor::new(client.clone(), config.feedback.clone());
        let assessor = AssessmentService::new(client.clone(), config.feedback.max_input_chars);
        Self {
            config,
            client,
            tutor,
            assessor,
            model_loaded: AtomicBool::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.model_loaded.load(Ordering::SeqCst)
    }

    /// Probe the model and record the result; never fails.
    pub async fn check_model(&self) -> bool {
        let loaded = match self.client.health().await {
            Ok(()) => {
                info!("Model service initialized successfully");
                true
            }
            Err(e) => {
                error!("Failed to initialize model service: {:#}", e);
                false
            }
        };
        self.model_loaded.store(loaded, Ordering::SeqCst);
        loaded
    }
}

// ============================================================================
// API Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Failed to analyze code: {0}")]
    Analysis(String),
    #[error("Failed to generate feedback: {0}")]
    Feedback(String),
    #[error("{}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidBody(rejection) => rejection.status(),
            Self::Analysis(_) | Self::Feedback(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            detail: self.to_string(),
        });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

pub(crate) fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let allow_origin = if origins.iter().any(|o| o.trim() == "*") {
        AllowOrigin::from(Any)
    } else {
        let values = origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o.trim())
                    .with_context(|| format!("Invalid CORS origin: {}", o))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

pub fn create_router(state: Arc<AppState>) -> Result<Router> {
    let cors = cors_layer(&state.config.server.cors_origins)?;

    Ok(Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/supported-languages", get(handle_supported_languages))
        .route("/analyze-code", post(handle_analyze_code))
        .route("/feedback", post(handle_feedback))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

/// Run the health check, then serve until the process is stopped.
pub async fn serve(config: Config, client: Arc<dyn LlmClient>) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, client));

    if !state.check_model().await {
        warn!("Starting without a reachable model; requests will fail until it is available");
    }

    let router = create_router(state)?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router)
        .await
        .context("HTTP server error")
}

// ============================================================================
// Handlers
// ============================================================================

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Programming Assessment AI API".to_string(),
        status: "running".to_string(),
    })
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: state.is_ready(),
        timestamp: Utc::now(),
    })
}

async fn handle_supported_languages() -> Json<SupportedLanguagesResponse> {
    Json(SupportedLanguagesResponse {
        languages: Language::ALL.to_vec(),
        feedback_types: FeedbackType::ALL.to_vec(),
    })
}

async fn handle_analyze_code(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CodeSubmission>, JsonRejection>,
) -> Result<Json<Assessment>, ApiError> {
    let Json(submission) = payload?;
    if submission.code.trim().is_empty() {
        return Err(ApiError::BadRequest("No code provided".to_string()));
    }

    match state.assessor.assess(&submission).await {
        Ok(assessment) => {
            info!("Feedback generated successfully");
            Ok(Json(assessment))
        }
        Err(e) => {
            error!("Error analyzing code: {:#}", e);
            Err(ApiError::Analysis(format!("{:#}", e)))
        }
    }
}

async fn handle_feedback(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<ComprehensiveFeedback>, ApiError> {
    let Json(request) = payload?;
    if request.code.trim().is_empty() {
        return Err(ApiError::BadRequest("No code provided".to_string()));
    }

    let level = request
        .student_level
        .unwrap_or(state.config.feedback.default_level);

    state
        .tutor
        .generate_comprehensive_feedback(&request.code, level)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Error generating feedback: {:#}", e);
            ApiError::Feedback(format!("{:#}", e))
        })
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use tower::util::ServiceExt;

    use super::*;
    use crate::config::FeedbackMode;
    use crate::feedback::FeedbackSource;
    use crate::llm::MockLlmClient;
    use anyhow::bail;
    use async_trait::async_trait;

    struct DownClient;

    #[async_trait]
    impl LlmClient for DownClient {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            bail!("Ollama is not reachable at http://localhost:11434")
        }

        async fn health(&self) -> anyhow::Result<()> {
            bail!("Ollama is not reachable at http://localhost:11434")
        }
    }

    fn mock_state() -> Arc<AppState> {
        Arc::new(AppState::new(
            Config::default(),
            Arc::new(MockLlmClient::new()),
        ))
    }

    async fn send(
        state: Arc<AppState>,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let router = create_router(state).unwrap();
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_root() {
        let (status, body) = send(mock_state(), Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Programming Assessment AI API");
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    async fn test_health_reflects_startup_check() {
        let state = mock_state();
        let (_, body) = send(state.clone(), Method::GET, "/health", None).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_loaded"], false);

        assert!(state.check_model().await);
        let (_, body) = send(state, Method::GET, "/health", None).await;
        assert_eq!(body["model_loaded"], true);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_failed_health_check_keeps_flag_false() {
        let state = Arc::new(AppState::new(Config::default(), Arc::new(DownClient)));
        assert!(!state.check_model().await);
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn test_supported_languages() {
        let (status, body) = send(mock_state(), Method::GET, "/supported-languages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["languages"][0], "python");
        assert_eq!(body["feedback_types"][4], "best_practices");
    }

    #[tokio::test]
    async fn test_analyze_code() {
        let (status, body) = send(
            mock_state(),
            Method::POST,
            "/analyze-code",
            Some(serde_json::json!({
                "code": "def add(a, b):\n    return a + b\n",
                "language": "python"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["overall_score"], 82.0);
        assert!(body["generated_at"].is_string());
    }

    #[tokio::test]
    async fn test_analyze_code_empty_is_bad_request() {
        let (status, body) = send(
            mock_state(),
            Method::POST,
            "/analyze-code",
            Some(serde_json::json!({"code": "  ", "language": "java"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "No code provided");
    }

    #[tokio::test]
    async fn test_malformed_body_returns_detail() {
        let router = create_router(mock_state()).unwrap();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/feedback")
            .header("content-type", "application/json")
            .body(Body::from("{\"code\": "))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(!body["detail"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_field_returns_detail() {
        let (status, body) = send(
            mock_state(),
            Method::POST,
            "/analyze-code",
            Some(serde_json::json!({"code": "x", "language": "cobol"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("cobol"));
    }

    #[tokio::test]
    async fn test_analyze_code_model_failure() {
        let state = Arc::new(AppState::new(Config::default(), Arc::new(DownClient)));
        let (status, body) = send(
            state,
            Method::POST,
            "/analyze-code",
            Some(serde_json::json!({"code": "print(1)", "language": "python"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("Failed to analyze code: "));
        assert!(detail.contains("not reachable"));
    }

    #[tokio::test]
    async fn test_feedback_endpoint() {
        let (status, body) = send(
            mock_state(),
            Method::POST,
            "/feedback",
            Some(serde_json::json!({"code": "x = 1", "student_level": "advanced"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["student_level"], "advanced");
        assert_eq!(body["source"], "model");
    }

    #[tokio::test]
    async fn test_feedback_demo_mode() {
        let mut config = Config::default();
        config.feedback.mode = FeedbackMode::Demo;
        let state = Arc::new(AppState::new(config, Arc::new(DownClient)));
        let (status, body) = send(
            state,
            Method::POST,
            "/feedback",
            Some(serde_json::json!({"code": "total = 1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let feedback: ComprehensiveFeedback = serde_json::from_value(body).unwrap();
        assert_eq!(feedback.source, FeedbackSource::Demo);
        assert_eq!(feedback.student_level, StudentLevel::Beginner);
    }

    #[test]
    fn test_invalid_cors_origin() {
        assert!(cors_layer(&["http://ok.example".to_string()]).is_ok());
        assert!(cors_layer(&["*".to_string()]).is_ok());
        assert!(cors_layer(&["bad\norigin".to_string()]).is_err());
    }
}
