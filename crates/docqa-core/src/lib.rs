//! docqa Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the docqa system:
//! - Error taxonomy for the answering pipeline
//! - Domain models (retrieved passages, per-question outcomes, ingestion state)
//! - Shared traits for external collaborators (completion service, document source)
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, LlmConfig, LlmProvider, LoggingConfig, PipelineConfig, ServerConfig,
    VectorConfig,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for pipeline operations
///
/// Fatal errors (`DocumentFetch`, `Parse`, `Ingestion`) abort the whole
/// request before any question is processed. Service errors raised during
/// per-question processing are recorded as that question's error marker and
/// never escalate. `Cache` exists for logging only and is always recovered
/// at the call site.
#[derive(Error, Debug)]
pub enum QaError {
    #[error("Document fetch failed: {0}")]
    DocumentFetch(String),

    #[error("Document parsing failed: {0}")]
    Parse(String),

    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Completion service error: {0}")]
    LlmService(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Deadline exceeded after {0}s")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QaError {
    /// Whether this error aborts the whole request rather than a single question
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DocumentFetch(_) | Self::Parse(_) | Self::Ingestion(_) | Self::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, QaError>;

// ============================================================================
// Ingestion State
// ============================================================================

/// Lifecycle of a document inside the pipeline
///
/// `NotIngested -> Ingesting -> {Ingested | Failed}`. The transition into
/// `Ingesting` is single-flight per document id; `Ingested` is terminal
/// success, `Failed` surfaces an `Ingestion` error to every question of the
/// request that triggered it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    #[default]
    NotIngested,
    Ingesting,
    Ingested,
    Failed,
}

impl std::fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotIngested => write!(f, "not_ingested"),
            Self::Ingesting => write!(f, "ingesting"),
            Self::Ingested => write!(f, "ingested"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ============================================================================
// Retrieval and Answer Types
// ============================================================================

/// A passage retrieved from the vector index for one question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Chunk text content
    pub content: String,

    /// Similarity score (higher is better)
    pub score: f32,

    /// Sequence index of the chunk within its document
    pub chunk_index: u32,
}

/// Reference to a source chunk that grounded an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSource {
    /// Sequence index of the chunk within the document
    pub chunk_index: u32,

    /// Similarity score at retrieval time
    pub score: f32,
}

/// Outcome of processing one question
///
/// Exactly one of `answer` / `error` is set. One outcome is produced per
/// input question, in input order, regardless of how many questions fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOutcome {
    /// The question as submitted
    pub question: String,

    /// Generated answer text, when processing succeeded
    pub answer: Option<String>,

    /// Error marker, when processing failed
    pub error: Option<String>,

    /// Chunks the answer was grounded on (empty for cache hits and failures)
    pub sources: Vec<AnswerSource>,
}

impl QuestionOutcome {
    /// Successful outcome with grounding sources
    pub fn answered(
        question: impl Into<String>,
        answer: impl Into<String>,
        sources: Vec<AnswerSource>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: Some(answer.into()),
            error: None,
            sources,
        }
    }

    /// Failed outcome carrying the error marker
    pub fn failed(question: impl Into<String>, error: &QaError) -> Self {
        Self {
            question: question.into(),
            answer: None,
            error: Some(error.to_string()),
            sources: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.answer.is_some()
    }
}

/// An answer text with its creation timestamp, as stored by the cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedAnswer {
    pub answer: String,
    pub cached_at: DateTime<Utc>,
}

impl CachedAnswer {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            cached_at: Utc::now(),
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for language-model completion services
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Trait for resolving a document reference into extracted text
///
/// Implementations download and extract; the pipeline never sees raw bytes.
#[async_trait::async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch and extract the text of the referenced document
    async fn fetch_text(&self, reference: &str) -> Result<String>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(QaError::DocumentFetch("gone".into()).is_fatal());
        assert!(QaError::Ingestion("upsert failed".into()).is_fatal());
        assert!(!QaError::LlmService("quota".into()).is_fatal());
        assert!(!QaError::Cache("refused".into()).is_fatal());
        assert!(!QaError::Timeout(300).is_fatal());
    }

    #[test]
    fn test_outcome_constructors() {
        let ok = QuestionOutcome::answered(
            "What is covered?",
            "Everything in section 3.",
            vec![AnswerSource {
                chunk_index: 2,
                score: 0.91,
            }],
        );
        assert!(ok.is_ok());
        assert_eq!(ok.sources.len(), 1);

        let err = QuestionOutcome::failed("What is covered?", &QaError::LlmService("503".into()));
        assert!(!err.is_ok());
        assert!(err.error.as_deref().unwrap().contains("503"));
        assert!(err.sources.is_empty());
    }

    #[test]
    fn test_ingestion_status_display() {
        assert_eq!(IngestionStatus::NotIngested.to_string(), "not_ingested");
        assert_eq!(IngestionStatus::Ingested.to_string(), "ingested");
    }
}
