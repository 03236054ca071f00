//! Answer caching
//!
//! Memoizes (document, question) -> answer so repeated questions skip
//! retrieval and synthesis entirely. The cache is advisory: every failure
//! degrades to a miss or a dropped write, logged but never surfaced, so the
//! pipeline keeps working when the cache does not.
//!
//! Keys hash the document identity together with the normalized question
//! text, so paraphrases that differ only in case or whitespace share an
//! entry while the same question against another document never collides.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docqa_core::CachedAnswer;
use moka::future::Cache;

// ============================================================================
// Cache Trait
// ============================================================================

/// Trait for answer cache stores
///
/// Both operations are best-effort by contract: implementations backed by an
/// external store must swallow their own failures.
#[async_trait]
pub trait AnswerCache: Send + Sync {
    /// Look up a cached answer
    async fn get(&self, document_id: &str, question: &str) -> Option<CachedAnswer>;

    /// Store an answer
    async fn put(&self, document_id: &str, question: &str, answer: String);
}

// ============================================================================
// Key Derivation
// ============================================================================

/// Normalize question text for cache keying
///
/// Lower-cases and collapses whitespace so trivial paraphrases hit the same
/// entry.
pub fn normalize_question(question: &str) -> String {
    question
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stable cache key over (document id, normalized question)
fn cache_key(document_id: &str, question: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    document_id.hash(&mut hasher);
    normalize_question(question).hash(&mut hasher);
    hasher.finish()
}

// ============================================================================
// Moka-backed Implementation
// ============================================================================

/// In-process answer cache with TTL and bounded capacity
#[derive(Clone)]
pub struct MokaAnswerCache {
    cache: Cache<u64, CachedAnswer>,
    stats: Arc<CacheStats>,
}

impl MokaAnswerCache {
    /// Create a cache with the given TTL and maximum entry count
    pub fn new(ttl_secs: u64, capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            cache,
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Current entry count
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl AnswerCache for MokaAnswerCache {
    async fn get(&self, document_id: &str, question: &str) -> Option<CachedAnswer> {
        let result = self.cache.get(&cache_key(document_id, question)).await;

        if result.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }

        result
    }

    async fn put(&self, document_id: &str, question: &str, answer: String) {
        self.cache
            .insert(cache_key(document_id, question), CachedAnswer::new(answer))
            .await;
        self.stats.record_write();
    }
}

// ============================================================================
// Cache Statistics
// ============================================================================

/// Hit/miss/write counters for cache monitoring
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Hit rate in 0.0 - 1.0, zero when nothing was requested yet
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_question() {
        assert_eq!(
            normalize_question("  What IS   the\tGrace Period? "),
            "what is the grace period?"
        );
    }

    #[test]
    fn test_paraphrases_share_a_key() {
        let doc = "https://example.com/policy.pdf";
        assert_eq!(
            cache_key(doc, "What is covered?"),
            cache_key(doc, "  what   IS covered? ")
        );
    }

    #[test]
    fn test_documents_do_not_collide() {
        let question = "What is covered?";
        assert_ne!(
            cache_key("https://example.com/a.pdf", question),
            cache_key("https://example.com/b.pdf", question)
        );
    }

    #[tokio::test]
    async fn test_get_put_round_trip() {
        let cache = MokaAnswerCache::new(60, 100);
        let doc = "doc";

        assert!(cache.get(doc, "q").await.is_none());
        assert_eq!(cache.stats().misses(), 1);

        cache.put(doc, "q", "the answer".to_string()).await;
        let hit = cache.get(doc, "q").await.expect("cached");
        assert_eq!(hit.answer, "the answer");
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().writes(), 1);
    }

    #[tokio::test]
    async fn test_normalized_hit() {
        let cache = MokaAnswerCache::new(60, 100);
        cache.put("doc", "What is the  waiting period?", "30 days".to_string()).await;

        let hit = cache.get("doc", "what is the waiting period?").await;
        assert_eq!(hit.map(|h| h.answer), Some("30 days".to_string()));
    }

    #[tokio::test]
    async fn test_stats_hit_rate() {
        let cache = MokaAnswerCache::new(60, 100);
        cache.get("doc", "q1").await;
        cache.put("doc", "q1", "a".to_string()).await;
        cache.get("doc", "q1").await;
        cache.get("doc", "q2").await;

        let stats = cache.stats();
        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.misses(), 2);
        assert!((stats.hit_rate() - 1.0 / 3.0).abs() < 1e-9);
    }
}
