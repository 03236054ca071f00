//! Qdrant implementation of the vector index
//!
//! A single collection holds all documents; each entry carries its document
//! id in the payload and queries filter on it, which gives every document
//! its own namespace. Point ids are derived deterministically from
//! (document id, chunk index) so re-ingestion overwrites instead of
//! appending.

use async_trait::async_trait;
use docqa_core::{QaError, Result, VectorConfig};
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, Distance, Filter, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{rank_chunks, IndexedEntry, ScoredChunk, VectorIndex};

/// Qdrant-backed vector index
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantIndex {
    /// Connect to Qdrant
    pub fn new(config: &VectorConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.qdrant_url)
            .build()
            .map_err(|e| QaError::VectorStore(format!("Qdrant connection failed: {e}")))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            dimension: config.vector_dimension,
        })
    }

    /// Create the collection if it does not exist (run once on startup)
    pub async fn init_collection(&self) -> Result<()> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| QaError::VectorStore(format!("failed to list collections: {e}")))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| QaError::VectorStore(format!("failed to create collection: {e}")))?;
            tracing::info!(collection = %self.collection, "created vector collection");
        }

        Ok(())
    }

    fn namespace_filter(document_id: &str) -> Filter {
        Filter::must([Condition::matches("document_id", document_id.to_string())])
    }
}

/// Stable point id for one chunk of one document
///
/// UUIDv5 over "document_id/chunk_index": re-upserting the same chunk always
/// hits the same point.
pub fn point_id(document_id: &str, chunk_index: u32) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("{document_id}/{chunk_index}").as_bytes(),
    )
    .to_string()
}

/// Payload stored with each vector
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChunkPayload {
    document_id: String,
    chunk_index: u32,
    content: String,
}

fn payload_map(
    payload: &ChunkPayload,
) -> std::collections::HashMap<String, qdrant_client::qdrant::Value> {
    serde_json::to_value(payload)
        .unwrap_or_default()
        .as_object()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.into()))
        .collect()
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, document_id: &str, entries: Vec<IndexedEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = entries
            .into_iter()
            .map(|entry| {
                let payload = ChunkPayload {
                    document_id: document_id.to_string(),
                    chunk_index: entry.chunk_index,
                    content: entry.content,
                };
                PointStruct::new(
                    point_id(document_id, entry.chunk_index),
                    entry.vector,
                    payload_map(&payload),
                )
            })
            .collect();

        let count = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await
            .map_err(|e| QaError::VectorStore(format!("failed to upsert vectors: {e}")))?;

        tracing::debug!(document_id, count, "upserted chunk vectors");
        Ok(())
    }

    async fn query(
        &self,
        document_id: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query_vector.to_vec(), top_k as u64)
                    .filter(Self::namespace_filter(document_id))
                    .with_payload(true),
            )
            .await
            .map_err(|e| QaError::VectorStore(format!("vector search failed: {e}")))?;

        let mut chunks: Vec<ScoredChunk> = results
            .result
            .into_iter()
            .map(|point| {
                let content = point
                    .payload
                    .get("content")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_default();

                let chunk_index = point
                    .payload
                    .get("chunk_index")
                    .and_then(|v| v.as_integer())
                    .unwrap_or_default() as u32;

                ScoredChunk {
                    content,
                    score: point.score,
                    chunk_index,
                }
            })
            .collect();

        rank_chunks(&mut chunks);
        Ok(chunks)
    }

    async fn namespace_exists(&self, document_id: &str) -> Result<bool> {
        let response = self
            .client
            .count(
                CountPointsBuilder::new(&self.collection)
                    .filter(Self::namespace_filter(document_id))
                    .exact(false),
            )
            .await
            .map_err(|e| QaError::VectorStore(format!("count failed: {e}")))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0) > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_deterministic() {
        let a = point_id("https://example.com/policy.pdf", 3);
        let b = point_id("https://example.com/policy.pdf", 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_point_id_distinct_per_chunk_and_document() {
        let doc = "https://example.com/policy.pdf";
        assert_ne!(point_id(doc, 0), point_id(doc, 1));
        assert_ne!(point_id(doc, 0), point_id("https://example.com/other.pdf", 0));
    }

    #[test]
    fn test_payload_round_trip_fields() {
        let payload = ChunkPayload {
            document_id: "doc".to_string(),
            chunk_index: 7,
            content: "chunk text".to_string(),
        };
        let map = payload_map(&payload);
        assert!(map.contains_key("document_id"));
        assert!(map.contains_key("chunk_index"));
        assert!(map.contains_key("content"));
    }
}
