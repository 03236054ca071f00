//! Passage retrieval
//!
//! Embeds a question, queries the document's namespace in the vector index,
//! and keeps only results at or above the similarity threshold. When the
//! filter empties the result set the retriever returns an empty sequence
//! rather than falling back to weakly related passages: grounding quality is
//! preferred over always having context.

use std::sync::Arc;

use docqa_core::Result;
use docqa_vector::{EmbeddingClient, ScoredChunk, VectorIndex};

/// Retrieves the passages most relevant to a question
pub struct Retriever {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    min_score: f32,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        top_k: usize,
        min_score: f32,
    ) -> Self {
        Self {
            embedder,
            index,
            top_k,
            min_score,
        }
    }

    /// Retrieve up to `top_k` passages scoring at least `min_score`
    pub async fn retrieve(&self, document_id: &str, question: &str) -> Result<Vec<ScoredChunk>> {
        let query_vector = self.embedder.embed(question).await?;

        let candidates = self
            .index
            .query(document_id, &query_vector, self.top_k)
            .await?;
        let candidate_count = candidates.len();

        let passages: Vec<ScoredChunk> = candidates
            .into_iter()
            .filter(|c| c.score >= self.min_score)
            .collect();

        tracing::debug!(
            document_id,
            candidates = candidate_count,
            kept = passages.len(),
            min_score = self.min_score,
            "retrieval complete"
        );

        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docqa_vector::IndexedEntry;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0; 4])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    struct FixedIndex {
        results: Vec<ScoredChunk>,
    }

    #[async_trait]
    impl VectorIndex for FixedIndex {
        async fn upsert(&self, _document_id: &str, _entries: Vec<IndexedEntry>) -> Result<()> {
            Ok(())
        }

        async fn query(
            &self,
            _document_id: &str,
            _query_vector: &[f32],
            _top_k: usize,
        ) -> Result<Vec<ScoredChunk>> {
            Ok(self.results.clone())
        }

        async fn namespace_exists(&self, _document_id: &str) -> Result<bool> {
            Ok(true)
        }
    }

    fn scored(content: &str, score: f32, chunk_index: u32) -> ScoredChunk {
        ScoredChunk {
            content: content.to_string(),
            score,
            chunk_index,
        }
    }

    #[tokio::test]
    async fn test_threshold_filters_weak_matches() {
        let retriever = Retriever::new(
            Arc::new(FixedEmbedder),
            Arc::new(FixedIndex {
                results: vec![scored("strong", 0.8, 0), scored("weak", 0.2, 1)],
            }),
            8,
            0.5,
        );

        let passages = retriever.retrieve("doc", "question").await.unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].content, "strong");
    }

    #[tokio::test]
    async fn test_no_fallback_when_all_below_threshold() {
        let retriever = Retriever::new(
            Arc::new(FixedEmbedder),
            Arc::new(FixedIndex {
                results: vec![scored("best", 0.5, 0)],
            }),
            8,
            0.9,
        );

        let passages = retriever.retrieve("doc", "question").await.unwrap();
        assert!(passages.is_empty());
    }

    #[tokio::test]
    async fn test_retrieval_order_is_preserved() {
        let retriever = Retriever::new(
            Arc::new(FixedEmbedder),
            Arc::new(FixedIndex {
                results: vec![scored("first", 0.9, 2), scored("second", 0.7, 0)],
            }),
            8,
            0.0,
        );

        let passages = retriever.retrieve("doc", "question").await.unwrap();
        assert_eq!(passages[0].content, "first");
        assert_eq!(passages[1].content, "second");
    }
}
