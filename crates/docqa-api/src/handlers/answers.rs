//! Document question-answering handler

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use docqa_core::QuestionOutcome;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

/// Answers request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnswersRequest {
    /// URL (or server-local path) of the PDF document
    #[schema(example = "https://example.com/policy.pdf")]
    pub document: String,

    /// Questions to answer, in order
    #[schema(example = json!(["What is the grace period?", "What is the waiting period?"]))]
    pub questions: Vec<String>,
}

/// Reference to a chunk that grounded an answer
#[derive(Debug, Serialize, ToSchema)]
pub struct SourceRef {
    /// Chunk sequence index within the document
    #[schema(example = 4)]
    pub chunk_index: u32,

    /// Similarity score at retrieval time
    #[schema(example = 0.87)]
    pub relevance: f32,
}

/// Per-question result
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerEntry {
    /// The question as submitted
    pub question: String,

    /// Generated answer, when processing succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    /// Error marker, when processing failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Chunks the answer was grounded on
    pub sources: Vec<SourceRef>,
}

impl From<QuestionOutcome> for AnswerEntry {
    fn from(outcome: QuestionOutcome) -> Self {
        Self {
            question: outcome.question,
            answer: outcome.answer,
            error: outcome.error,
            sources: outcome
                .sources
                .into_iter()
                .map(|s| SourceRef {
                    chunk_index: s.chunk_index,
                    relevance: s.score,
                })
                .collect(),
        }
    }
}

/// Answers response body
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswersResponse {
    /// One entry per input question, in input order
    pub answers: Vec<AnswerEntry>,

    /// Processing time in milliseconds
    #[schema(example = 1250)]
    pub processing_time_ms: u64,
}

/// Answer a list of questions about a document
#[utoipa::path(
    post,
    path = "/api/v1/answers",
    tag = "answers",
    request_body = AnswersRequest,
    responses(
        (status = 200, description = "Per-question results in input order", body = AnswersResponse),
        (status = 400, description = "Invalid request or unreachable document", body = crate::error::ApiError),
        (status = 503, description = "Pipeline not initialized", body = crate::error::ApiError),
        (status = 500, description = "Internal error", body = crate::error::ApiError)
    )
)]
pub async fn answers_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();
    let start = Instant::now();

    if req.document.trim().is_empty() {
        return Err(AppError::BadRequest(
            "document reference cannot be empty".to_string(),
        ));
    }
    if req.questions.is_empty() {
        return Err(AppError::BadRequest(
            "at least one question is required".to_string(),
        ));
    }
    if req.questions.iter().any(|q| q.trim().is_empty()) {
        return Err(AppError::BadRequest("questions cannot be empty".to_string()));
    }

    let pipeline = state.get_pipeline().await.ok_or_else(|| {
        AppError::ServiceUnavailable("answering pipeline not initialized".to_string())
    })?;

    let outcomes = pipeline.answer(&req.document, req.questions).await?;

    let response = AnswersResponse {
        answers: outcomes.into_iter().map(AnswerEntry::from).collect(),
        processing_time_ms: start.elapsed().as_millis() as u64,
    };

    Ok((StatusCode::OK, Json(response)))
}
