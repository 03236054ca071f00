//! docqa Vector - Embedding generation and vector index abstraction
//!
//! Provides the embedding client trait (OpenAI and Ollama implementations)
//! and the vector index trait with a Qdrant backend. Index entries are
//! namespaced per document id; retrieval is ordered by descending score with
//! ties broken by ascending chunk sequence index for determinism.

use async_trait::async_trait;
use docqa_core::Result;

pub mod embedding;
pub mod qdrant_index;

pub use embedding::{create_embedding_client, EmbeddingClient, OllamaEmbedder, OpenAiEmbedder};
pub use qdrant_index::QdrantIndex;

/// One chunk prepared for indexing
#[derive(Debug, Clone)]
pub struct IndexedEntry {
    /// Owning document id (the index namespace)
    pub document_id: String,

    /// Chunk sequence index within the document
    pub chunk_index: u32,

    /// Embedding vector for the chunk text
    pub vector: Vec<f32>,

    /// Chunk text content
    pub content: String,
}

/// A chunk returned from a similarity query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// Chunk text content
    pub content: String,

    /// Similarity score (higher is better)
    pub score: f32,

    /// Chunk sequence index within the document
    pub chunk_index: u32,
}

/// Trait for vector index operations
///
/// Upserts are idempotent per (document id, chunk index): re-ingesting a
/// document overwrites its prior vectors, never duplicates them.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store entries under the document's namespace
    async fn upsert(&self, document_id: &str, entries: Vec<IndexedEntry>) -> Result<()>;

    /// Query the document's namespace for the `top_k` most similar chunks
    async fn query(
        &self,
        document_id: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Whether the document's namespace already holds any entries
    async fn namespace_exists(&self, document_id: &str) -> Result<bool>;
}

/// Order query results for deterministic retrieval
///
/// Descending score; equal scores fall back to ascending chunk index.
pub fn rank_chunks(chunks: &mut [ScoredChunk]) {
    chunks.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.chunk_index.cmp(&b.chunk_index))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(content: &str, score: f32, chunk_index: u32) -> ScoredChunk {
        ScoredChunk {
            content: content.to_string(),
            score,
            chunk_index,
        }
    }

    #[test]
    fn test_rank_by_descending_score() {
        let mut chunks = vec![scored("a", 0.2, 0), scored("b", 0.9, 1), scored("c", 0.5, 2)];
        rank_chunks(&mut chunks);
        assert_eq!(
            chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>(),
            vec!["b", "c", "a"]
        );
    }

    #[test]
    fn test_rank_ties_broken_by_chunk_index() {
        let mut chunks = vec![scored("late", 0.7, 5), scored("early", 0.7, 1)];
        rank_chunks(&mut chunks);
        assert_eq!(chunks[0].content, "early");
        assert_eq!(chunks[1].content, "late");
    }
}
