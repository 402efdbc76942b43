//! Semantic answer caching service
//!
//! Wraps an expensive computation with a lookup in the similarity cache:
//! a query whose embedding is close enough to a previously answered one
//! returns the stored answer instead of recomputing it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::embedding::EmbeddingProvider;
use crate::domain::semantic_cache::{CacheStats, SemanticCacheConfig, SimilarityCacheStore};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_cache_lookup, LookupResult};

/// Per-call cache parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheOptions {
    pub ttl: Duration,
    pub threshold: f32,
}

impl CacheOptions {
    pub fn new(ttl: Duration, threshold: f32) -> Self {
        Self {
            ttl,
            threshold: threshold.clamp(0.0, 1.0),
        }
    }
}

impl From<&SemanticCacheConfig> for CacheOptions {
    fn from(config: &SemanticCacheConfig) -> Self {
        Self::new(config.ttl(), config.similarity_threshold)
    }
}

/// How a value was obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheStatus {
    /// Served from the cache
    Hit { similarity: f32 },
    /// Computed and stored
    Miss,
    /// Computed without touching the cache
    Bypassed,
}

impl CacheStatus {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit { .. })
    }
}

/// Value returned by [`SemanticCacheService::get_or_compute`]
#[derive(Debug, Clone)]
pub struct CacheOutcome<T> {
    pub value: T,
    pub status: CacheStatus,
}

/// Cache coordinator in front of an answer computation
#[derive(Debug)]
pub struct SemanticCacheService {
    store: Arc<dyn SimilarityCacheStore>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    config: SemanticCacheConfig,
}

impl SemanticCacheService {
    pub fn new(
        store: Arc<dyn SimilarityCacheStore>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        config: SemanticCacheConfig,
    ) -> Self {
        Self {
            store,
            embedding_provider,
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &SemanticCacheConfig {
        &self.config
    }

    /// Get the answer for `query` from the cache, or compute and cache it,
    /// using the configured TTL and similarity threshold
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        query: &str,
        compute: F,
    ) -> Result<CacheOutcome<T>, DomainError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let options = CacheOptions::from(&self.config);
        self.get_or_compute_with(query, &options, compute).await
    }

    /// Same as [`Self::get_or_compute`] with explicit options
    ///
    /// Errors of `compute` are returned as is. Cache-side failures never
    /// fail the call: an embedding error bypasses the cache, a store error
    /// or an undecodable payload counts as a miss and a failed write is
    /// only logged.
    pub async fn get_or_compute_with<T, F, Fut>(
        &self,
        query: &str,
        options: &CacheOptions,
        compute: F,
    ) -> Result<CacheOutcome<T>, DomainError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        if !self.config.enabled {
            record_cache_lookup(LookupResult::Bypass);
            return Self::bypass(query, compute).await;
        }

        let embedding = match self.embedding_provider.embed(query).await {
            Ok(embedding) => embedding.into_vector(),
            Err(e) => {
                warn!(error = %e, "Failed to embed query, bypassing semantic cache");
                record_cache_lookup(LookupResult::Bypass);
                return Self::bypass(query, compute).await;
            }
        };

        match self.store.lookup(&embedding, options.threshold).await {
            Ok(Some(hit)) => match hit.entry.decode_payload::<T>() {
                Ok(value) => {
                    debug!(
                        entry_id = hit.entry.id(),
                        similarity = hit.similarity,
                        "Semantic cache hit"
                    );
                    record_cache_lookup(LookupResult::Hit);
                    return Ok(CacheOutcome {
                        value,
                        status: CacheStatus::Hit {
                            similarity: hit.similarity,
                        },
                    });
                }
                Err(e) => {
                    warn!(entry_id = hit.entry.id(), error = %e, "Ignoring undecodable cached payload");
                }
            },
            Ok(None) => {
                debug!(threshold = options.threshold, "Semantic cache miss");
            }
            Err(e) => {
                warn!(error = %e, "Semantic cache lookup failed, treating as miss");
            }
        }

        record_cache_lookup(LookupResult::Miss);

        let value = compute(query.to_string()).await?;

        match serde_json::to_string(&value) {
            Ok(payload) => {
                if let Err(e) = self.store.put(embedding, query, payload, options.ttl).await {
                    warn!(error = %e, "Failed to store computed answer in semantic cache");
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize computed answer for semantic cache");
            }
        }

        Ok(CacheOutcome {
            value,
            status: CacheStatus::Miss,
        })
    }

    async fn bypass<T, F, Fut>(query: &str, compute: F) -> Result<CacheOutcome<T>, DomainError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let value = compute(query.to_string()).await?;

        Ok(CacheOutcome {
            value,
            status: CacheStatus::Bypassed,
        })
    }

    pub async fn stats(&self) -> Result<CacheStats, DomainError> {
        self.store.stats().await
    }

    /// Remove expired entries now
    pub async fn purge_expired(&self) -> Result<usize, DomainError> {
        self.store.purge_expired().await
    }

    pub async fn clear(&self) -> Result<(), DomainError> {
        self.store.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::semantic_cache::ManualClock;
    use crate::infrastructure::semantic_cache::InMemorySimilarityStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DIMS: usize = 8;

    fn config() -> SemanticCacheConfig {
        SemanticCacheConfig::new()
            .with_dimensions(DIMS)
            .with_max_entries(10)
            .with_similarity_threshold(0.95)
    }

    fn service_with(
        provider: MockEmbeddingProvider,
        config: SemanticCacheConfig,
    ) -> (SemanticCacheService, Arc<InMemorySimilarityStore>) {
        let store = Arc::new(InMemorySimilarityStore::new(config.max_entries, DIMS));
        let service = SemanticCacheService::new(store.clone(), Arc::new(provider), config);
        (service, store)
    }

    async fn answer(
        service: &SemanticCacheService,
        query: &str,
        computed: &AtomicUsize,
    ) -> CacheOutcome<String> {
        service
            .get_or_compute(query, |q| async move {
                computed.fetch_add(1, Ordering::SeqCst);
                Ok(format!("answer to {}", q))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_second_identical_query_is_served_from_cache() {
        let (service, store) = service_with(MockEmbeddingProvider::new(DIMS), config());
        let computed = AtomicUsize::new(0);

        let first = answer(&service, "What is Rust?", &computed).await;
        let second = answer(&service, "What is Rust?", &computed).await;

        assert_eq!(first.status, CacheStatus::Miss);
        assert!(second.status.is_hit());
        assert_eq!(second.value, "answer to What is Rust?");
        assert_eq!(computed.load(Ordering::SeqCst), 1);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_repeat_query_hits_at_threshold_one() {
        let store = Arc::new(InMemorySimilarityStore::new(10, 768));
        let service = SemanticCacheService::new(
            store,
            Arc::new(MockEmbeddingProvider::new(768)),
            config().with_dimensions(768).with_similarity_threshold(1.0),
        );
        let computed = AtomicUsize::new(0);

        for query in ["What is Rust?", "Who founded Mozilla?", "Capital of Peru"] {
            let first = answer(&service, query, &computed).await;
            let second = answer(&service, query, &computed).await;

            assert_eq!(first.status, CacheStatus::Miss);
            assert_eq!(second.status, CacheStatus::Hit { similarity: 1.0 });
        }
        assert_eq!(computed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_computes() {
        let provider = MockEmbeddingProvider::new(DIMS);
        let store = Arc::new(InMemorySimilarityStore::new(10, DIMS));
        let provider = Arc::new(provider);
        let service =
            SemanticCacheService::new(store.clone(), provider.clone(), config().with_enabled(false));
        let computed = AtomicUsize::new(0);

        let first = answer(&service, "q", &computed).await;
        let second = answer(&service, "q", &computed).await;

        assert_eq!(first.status, CacheStatus::Bypassed);
        assert_eq!(second.status, CacheStatus::Bypassed);
        assert_eq!(computed.load(Ordering::SeqCst), 2);
        assert_eq!(provider.calls(), 0);
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_bypasses_cache() {
        let (service, store) = service_with(
            MockEmbeddingProvider::new(DIMS).with_error("embedding model offline"),
            config(),
        );
        let computed = AtomicUsize::new(0);

        let outcome = answer(&service, "q", &computed).await;

        assert_eq!(outcome.status, CacheStatus::Bypassed);
        assert_eq!(outcome.value, "answer to q");
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_compute_error_is_propagated_and_not_cached() {
        let (service, store) = service_with(MockEmbeddingProvider::new(DIMS), config());

        let result: Result<CacheOutcome<String>, _> = service
            .get_or_compute("q", |_| async { Err(DomainError::provider("ollama", "timeout")) })
            .await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_threshold_decides_hit() {
        let mut a = vec![0.0; DIMS];
        a[0] = 1.0;
        let mut b = vec![0.0; DIMS];
        b[0] = 0.6;
        b[1] = 0.8;

        let provider = MockEmbeddingProvider::new(DIMS)
            .with_vector("capital of France", a)
            .with_vector("France's capital city", b);
        let (service, _) = service_with(provider, config());
        let computed = AtomicUsize::new(0);

        answer(&service, "capital of France", &computed).await;
        let strict = answer(&service, "France's capital city", &computed).await;
        assert_eq!(strict.status, CacheStatus::Miss);

        let loose: CacheOutcome<String> = service
            .get_or_compute_with(
                "France's capital city",
                &CacheOptions::new(Duration::from_secs(60), 0.5),
                |_| async { Ok("recomputed".to_string()) },
            )
            .await
            .unwrap();

        match loose.status {
            CacheStatus::Hit { similarity } => assert!(similarity >= 0.5),
            other => panic!("expected hit, got {:?}", other),
        }
        assert_eq!(computed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_answer_is_recomputed() {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(InMemorySimilarityStore::with_clock(10, DIMS, clock.clone()));
        let service = SemanticCacheService::new(
            store,
            Arc::new(MockEmbeddingProvider::new(DIMS)),
            config().with_ttl(Duration::from_secs(60)),
        );
        let computed = AtomicUsize::new(0);

        answer(&service, "q", &computed).await;
        clock.advance(Duration::from_secs(59));
        assert!(answer(&service, "q", &computed).await.status.is_hit());

        clock.advance(Duration::from_secs(1));
        assert_eq!(answer(&service, "q", &computed).await.status, CacheStatus::Miss);
        assert_eq!(computed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_undecodable_payload_counts_as_miss() {
        let provider = MockEmbeddingProvider::new(DIMS);
        let embedding = provider.embed("q").await.unwrap().into_vector();
        let (service, store) = service_with(provider, config());

        store
            .put(embedding, "q", "not json".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let computed = AtomicUsize::new(0);
        let outcome = answer(&service, "q", &computed).await;

        assert_eq!(outcome.status, CacheStatus::Miss);
        assert_eq!(computed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let (service, _) = service_with(MockEmbeddingProvider::new(DIMS), config());
        let computed = AtomicUsize::new(0);

        answer(&service, "q", &computed).await;
        answer(&service, "q", &computed).await;

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);

        service.clear().await.unwrap();
        assert_eq!(service.stats().await.unwrap().entries, 0);
        assert_eq!(service.purge_expired().await.unwrap(), 0);
    }

    #[test]
    fn test_options_clamp_threshold() {
        assert_eq!(CacheOptions::new(Duration::ZERO, 1.5).threshold, 1.0);
        assert_eq!(
            CacheOptions::from(&config()).ttl,
            Duration::from_secs(3600)
        );
    }
}
