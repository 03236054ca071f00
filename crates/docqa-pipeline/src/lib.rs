//! docqa Pipeline - Retrieval-augmented answering orchestrator
//!
//! Coordinates the full question-answering flow over one document:
//! idempotent ingestion (fetch, chunk, embed, upsert, single-flight per
//! document id) followed by concurrent per-question processing (cache check,
//! retrieve, synthesize, cache write) under a bounded concurrency limit and
//! an overall request deadline.
//!
//! Failure scoping: document-level failures abort the request before any
//! question runs; a failing question only marks its own slot and never
//! affects the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use docqa_core::{
    AnswerSource, AppConfig, CompletionClient, DocumentSource, IngestionStatus, PipelineConfig,
    QaError, QuestionOutcome, Result,
};
use docqa_parser::chunk;
use docqa_vector::{EmbeddingClient, IndexedEntry, VectorIndex};
use tokio::sync::{OnceCell, Semaphore};
use tokio::time::{timeout_at, Instant};

pub mod cache;
pub mod llm;
pub mod retriever;
pub mod synthesizer;

pub use cache::{AnswerCache, CacheStats, MokaAnswerCache};
pub use llm::{create_completion_client, OllamaCompletion, OpenAiCompletion};
pub use retriever::Retriever;
pub use synthesizer::{AnswerSynthesizer, PromptBuilder};

// ============================================================================
// Retry Helper
// ============================================================================

/// Run an operation with capped exponential backoff
///
/// Makes up to `attempts` tries, sleeping `base_delay * 2^(n-1)` between
/// them, and returns the last error when the cap is reached. Used on the
/// ingestion path where transient service failures are worth absorbing; the
/// per-question path does not retry by default to protect the latency
/// budget.
pub async fn retry_with_backoff<T, F, Fut>(
    attempts: u32,
    base_delay: Duration,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= attempts {
                    return Err(err);
                }
                let delay = base_delay * 2u32.pow(attempt - 1);
                tracing::warn!(
                    attempt,
                    attempts,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

// ============================================================================
// Pipeline Coordinator
// ============================================================================

/// Orchestrates ingestion and concurrent per-question answering
///
/// All collaborators are injected at construction; the pipeline owns no
/// network state of its own and is safe to share behind an `Arc`.
pub struct QaPipeline {
    source: Arc<dyn DocumentSource>,
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    cache: Arc<dyn AnswerCache>,
    config: PipelineConfig,
    semaphore: Arc<Semaphore>,
    ingest_guards: tokio::sync::Mutex<HashMap<String, Arc<OnceCell<()>>>>,
    statuses: std::sync::Mutex<HashMap<String, IngestionStatus>>,
}

impl QaPipeline {
    /// Create a pipeline from explicit collaborators
    pub fn new(
        source: Arc<dyn DocumentSource>,
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn CompletionClient>,
        cache: Arc<dyn AnswerCache>,
        config: PipelineConfig,
    ) -> Self {
        let retriever = Retriever::new(
            Arc::clone(&embedder),
            Arc::clone(&index),
            config.top_k,
            config.min_score,
        );
        let synthesizer = AnswerSynthesizer::new(llm, config.max_context_chars);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency));

        Self {
            source,
            embedder,
            index,
            retriever,
            synthesizer,
            cache,
            config,
            semaphore,
            ingest_guards: tokio::sync::Mutex::new(HashMap::new()),
            statuses: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Build a pipeline with concrete collaborators from configuration
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let source = Arc::new(docqa_parser::HttpDocumentSource::new());
        let embedder: Arc<dyn EmbeddingClient> =
            Arc::from(docqa_vector::create_embedding_client(&config.llm)?);

        let index = docqa_vector::QdrantIndex::new(&config.vector)?;
        index.init_collection().await?;

        let llm: Arc<dyn CompletionClient> = Arc::from(llm::create_completion_client(&config.llm)?);
        let cache = Arc::new(MokaAnswerCache::new(
            config.pipeline.cache_ttl_secs,
            config.pipeline.cache_capacity,
        ));

        Ok(Self::new(
            source,
            embedder,
            Arc::new(index),
            llm,
            cache,
            config.pipeline.clone(),
        ))
    }

    /// Answer a list of questions about one document
    ///
    /// Ensures the document is ingested, then processes every question under
    /// the concurrency limit. The returned outcomes match the input order
    /// 1:1 regardless of completion order; questions still in flight when
    /// the request deadline expires receive a timeout marker while completed
    /// answers are kept.
    pub async fn answer(
        &self,
        document: &str,
        questions: Vec<String>,
    ) -> Result<Vec<QuestionOutcome>> {
        let deadline = Instant::now() + Duration::from_secs(self.config.request_deadline_secs);
        tracing::info!(document, questions = questions.len(), "answering request");

        match timeout_at(deadline, self.ensure_ingested(document)).await {
            Ok(result) => result?,
            Err(_) => return Err(QaError::Timeout(self.config.request_deadline_secs)),
        }

        let tasks = questions.into_iter().map(|question| async move {
            match timeout_at(deadline, self.process_question(document, &question)).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => {
                    tracing::warn!(question = %question, error = %err, "question failed");
                    QuestionOutcome::failed(question, &err)
                }
                Err(_) => QuestionOutcome::failed(
                    question,
                    &QaError::Timeout(self.config.request_deadline_secs),
                ),
            }
        });

        // Collection restores input order; completion order is arbitrary.
        let outcomes = futures::future::join_all(tasks).await;

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        tracing::info!(document, answered = outcomes.len() - failed, failed, "request complete");
        Ok(outcomes)
    }

    /// Ensure the document is present in the vector index
    ///
    /// Single-flight per document id: concurrent callers share one ingestion
    /// attempt. Success is latched for the process lifetime; a failed
    /// attempt surfaces its error and leaves the next request free to retry.
    pub async fn ensure_ingested(&self, document: &str) -> Result<()> {
        let cell = {
            let mut guards = self.ingest_guards.lock().await;
            Arc::clone(guards.entry(document.to_string()).or_default())
        };

        cell.get_or_try_init(|| async {
            self.set_status(document, IngestionStatus::Ingesting);
            match self.ingest(document).await {
                Ok(()) => {
                    self.set_status(document, IngestionStatus::Ingested);
                    Ok(())
                }
                Err(err) => {
                    self.set_status(document, IngestionStatus::Failed);
                    Err(err)
                }
            }
        })
        .await?;

        Ok(())
    }

    /// Current ingestion status for a document id
    pub fn ingestion_status(&self, document: &str) -> IngestionStatus {
        self.statuses
            .lock()
            .map(|m| m.get(document).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    fn set_status(&self, document: &str, status: IngestionStatus) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.insert(document.to_string(), status);
        }
    }

    async fn ingest(&self, document: &str) -> Result<()> {
        let exists = self
            .index
            .namespace_exists(document)
            .await
            .map_err(|e| QaError::Ingestion(e.to_string()))?;
        if exists {
            tracing::info!(document, "document already indexed, skipping ingestion");
            return Ok(());
        }

        let text = self.source.fetch_text(document).await?;

        let chunks = chunk(&text, self.config.chunk_size, self.config.chunk_overlap);
        if chunks.is_empty() {
            return Err(QaError::Parse("document produced no chunks".to_string()));
        }
        tracing::info!(document, chunks = chunks.len(), "document chunked");

        let attempts = self.config.ingest_retry_attempts;
        let base_delay = Duration::from_millis(self.config.ingest_retry_base_ms);

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = retry_with_backoff(attempts, base_delay, || self.embedder.embed_batch(&texts))
            .await
            .map_err(|e| QaError::Ingestion(e.to_string()))?;

        let entries: Vec<IndexedEntry> = chunks
            .iter()
            .zip(vectors)
            .map(|(c, vector)| IndexedEntry {
                document_id: document.to_string(),
                chunk_index: c.index,
                vector,
                content: c.content.clone(),
            })
            .collect();

        retry_with_backoff(attempts, base_delay, || {
            let entries = entries.clone();
            async move { self.index.upsert(document, entries).await }
        })
        .await
        .map_err(|e| QaError::Ingestion(e.to_string()))?;

        tracing::info!(document, entries = chunks.len(), "document ingested");
        Ok(())
    }

    async fn process_question(&self, document: &str, question: &str) -> Result<QuestionOutcome> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| QaError::Other(anyhow::anyhow!("question semaphore closed")))?;

        if let Some(hit) = self.cache.get(document, question).await {
            tracing::debug!(question, "answer served from cache");
            return Ok(QuestionOutcome::answered(question, hit.answer, Vec::new()));
        }

        let passages = self.retriever.retrieve(document, question).await?;
        let sources: Vec<AnswerSource> = passages
            .iter()
            .map(|p| AnswerSource {
                chunk_index: p.chunk_index,
                score: p.score,
            })
            .collect();

        let answer = self.synthesizer.synthesize(question, &passages).await?;

        self.cache.put(document, question, answer.clone()).await;

        Ok(QuestionOutcome::answered(question, answer, sources))
    }
}

// ============================================================================
// Tests
// ============================================================================
