use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use http::{header, HeaderValue, Method, StatusCode};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

use crate::error::{GenerationError, ProviderError};
use crate::quiz::ai_helper::Completer;
use crate::quiz::feedback::{generate_feedback, FeedbackRequest};
use crate::quiz::generator::QuestionGenerator;
use crate::quiz::prompts::CONNECTION_PROBE;
use crate::quiz::scoring::ScoreResult;
use crate::quiz::session::SessionStore;
use crate::quiz::{Question, QuestionBank, TestResponse};

/// Everything the handlers share. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub bank: Arc<QuestionBank>,
    pub store: Arc<SessionStore>,
    pub completer: Arc<dyn Completer>,
    pub generator: Arc<QuestionGenerator>,
    pub total_questions: u32,
}

impl AppState {
    pub fn new(
        bank: QuestionBank,
        completer: Arc<dyn Completer>,
        generator: QuestionGenerator,
        total_questions: u32,
    ) -> Self {
        Self {
            store: Arc::new(SessionStore::new(bank.len())),
            bank: Arc::new(bank),
            completer,
            generator: Arc::new(generator),
            total_questions,
        }
    }
}

#[derive(Error, Debug)]
pub(crate) enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Generation(e) => {
                log::error!("Question generation failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate question".to_string())
            }
            ApiError::Provider(e) => {
                log::error!("Completion backend failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to reach the language model".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn create_router(state: AppState, allowed_origins: &[String], static_dir: &std::path::Path) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/test_llm_connection", get(test_llm_connection))
        .route("/get_question", post(get_question))
        .route("/process_iq_test", post(process_iq_test))
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .layer(Extension(state))
}

#[derive(Debug, serde::Serialize)]
struct ConnectionStatus {
    status: &'static str,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ConnectionStatus {
    fn failed(error: String) -> Self {
        Self {
            status: "error",
            message: "LLM Connection Failed",
            error: Some(error),
        }
    }
}

async fn test_llm_connection(Extension(state): Extension<AppState>) -> Json<ConnectionStatus> {
    let status = match state.completer.complete(CONNECTION_PROBE).await {
        Ok(text) if !text.trim().is_empty() => ConnectionStatus {
            status: "success",
            message: "LLM Connection Successful",
            error: None,
        },
        Ok(_) => ConnectionStatus::failed("No response text from LLM".to_string()),
        Err(e) => {
            log::warn!("LLM connection check failed: {e}");
            ConnectionStatus::failed(e.to_string())
        }
    };
    Json(status)
}

#[derive(Debug, serde::Deserialize)]
struct QuestionRequest {
    question_index: usize,
}

#[derive(Debug, serde::Serialize)]
struct QuestionResponse {
    question: Question,
    generation_percentage: f64,
}

async fn get_question(
    Extension(state): Extension<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let Json(request) = payload?;
    let index = request.question_index;

    let question = match state.store.get(index) {
        Some(cached) => cached,
        None => {
            let source = state
                .bank
                .get(index)
                .ok_or_else(|| ApiError::Validation("Invalid question index".to_string()))?;
            let generated = state.generator.generate(index, source).await?;
            state.store.put(index, generated.clone());
            log::info!(
                "Stored question {index}, completion ratio now {:.2}",
                state.store.completion_ratio()
            );
            generated
        }
    };

    Ok(Json(QuestionResponse {
        question,
        generation_percentage: state.store.generation_percentage(),
    }))
}

#[derive(Debug, serde::Deserialize)]
struct IqTestRequest {
    #[serde(alias = "score")]
    overall_score: i64,
    user_responses: Vec<TestResponse>,
    // Only its presence matters: the breakdown is recomputed from the responses.
    #[serde(default)]
    category_scores: Option<serde_json::Value>,
}

#[derive(Debug, serde::Serialize)]
struct IqTestResponse {
    iq_level_description: &'static str,
    iq_score: i64,
    feedback_html: String,
}

async fn process_iq_test(
    Extension(state): Extension<AppState>,
    payload: Result<Json<IqTestRequest>, JsonRejection>,
) -> Result<Json<IqTestResponse>, ApiError> {
    let Json(request) = payload?;

    let score = ScoreResult::new(request.overall_score, state.total_questions);
    let feedback_html = generate_feedback(
        state.completer.as_ref(),
        &FeedbackRequest {
            score: &score,
            total_questions: state.total_questions,
            responses: &request.user_responses,
            with_categories: request.category_scores.is_some(),
        },
    )
    .await?;
    log::info!(
        "Feedback generated for raw score {} (IQ {})",
        score.raw_score,
        score.iq_estimate
    );

    Ok(Json(IqTestResponse {
        iq_level_description: score.level_description,
        iq_score: score.iq_estimate,
        feedback_html,
    }))
}
