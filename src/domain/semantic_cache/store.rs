//! Similarity cache store trait and types

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::CacheEntry;
use crate::domain::DomainError;

/// Best matching entry of a lookup
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub entry: CacheEntry,
    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
}

/// Statistics for a similarity cache store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub avg_hit_similarity: f32,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;

        if total == 0 {
            return 0.0;
        }

        self.hits as f32 / total as f32
    }
}

/// Store of cached answers looked up by embedding proximity
///
/// Implementations keep at most their configured capacity of entries,
/// evicting expired entries first and then the least recently used one.
/// A lookup never returns an expired entry and refreshes the recency of
/// the entry it returns. Backend transport failures during `lookup` are
/// reported as a miss rather than an error.
#[async_trait]
pub trait SimilarityCacheStore: Send + Sync + Debug {
    /// Insert a new entry expiring `ttl` from now
    async fn put(
        &self,
        embedding: Vec<f32>,
        query_text: &str,
        payload: String,
        ttl: Duration,
    ) -> Result<(), DomainError>;

    /// Find the most similar live entry whose similarity is at least `threshold`
    async fn lookup(
        &self,
        embedding: &[f32],
        threshold: f32,
    ) -> Result<Option<CacheHit>, DomainError>;

    /// Remove all expired entries, returning how many were removed
    async fn purge_expired(&self) -> Result<usize, DomainError>;

    /// Number of stored entries, expired or not
    async fn len(&self) -> Result<usize, DomainError>;

    async fn stats(&self) -> Result<CacheStats, DomainError>;

    async fn clear(&self) -> Result<(), DomainError>;

    /// Check the backend is reachable
    async fn ping(&self) -> Result<(), DomainError>;

    fn backend_name(&self) -> &'static str;
}

/// Running average of hit similarities
#[derive(Debug, Default)]
pub(crate) struct SimilarityAverage {
    total: f64,
    count: u64,
}

impl SimilarityAverage {
    pub(crate) fn record(&mut self, similarity: f32) {
        self.total += similarity as f64;
        self.count += 1;
    }

    pub(crate) fn value(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }

        (self.total / self.count as f64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            entries: 10,
            hits: 3,
            misses: 1,
            ..Default::default()
        };

        assert!((stats.hit_rate() - 0.75).abs() < 0.001);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_similarity_average() {
        let mut avg = SimilarityAverage::default();
        assert_eq!(avg.value(), 0.0);

        avg.record(1.0);
        avg.record(0.9);

        assert!((avg.value() - 0.95).abs() < 0.001);
    }
}
