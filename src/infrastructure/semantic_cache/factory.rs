//! Similarity store factory for runtime backend selection

use std::sync::Arc;

use tracing::info;

use crate::domain::semantic_cache::{CacheBackend, SemanticCacheConfig, SimilarityCacheStore};
use crate::domain::DomainError;

use super::in_memory::InMemorySimilarityStore;
use super::redis::{RedisConfig, RedisSimilarityStore};

/// Factory for creating similarity cache stores
#[derive(Debug, Default)]
pub struct SimilarityStoreFactory;

impl SimilarityStoreFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates the store selected by `config.backend`
    pub async fn create(
        &self,
        config: &SemanticCacheConfig,
        redis: &RedisConfig,
    ) -> Result<Arc<dyn SimilarityCacheStore>, DomainError> {
        info!(backend = %config.backend, max_entries = config.max_entries, "Creating similarity cache store");

        match config.backend {
            CacheBackend::InMemory => Ok(Arc::new(InMemorySimilarityStore::new(
                config.max_entries,
                config.dimensions,
            ))),
            CacheBackend::Redis => {
                let store = RedisSimilarityStore::connect(
                    redis,
                    config.namespace.clone(),
                    config.max_entries,
                    config.dimensions,
                )
                .await?;
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory() {
        let config = SemanticCacheConfig::default().with_max_entries(5).with_dimensions(3);

        let store = SimilarityStoreFactory::new()
            .create(&config, &RedisConfig::default())
            .await
            .unwrap();

        assert_eq!(store.backend_name(), "in_memory");
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_redis_with_bad_url_fails() {
        let config = SemanticCacheConfig::default().with_backend(CacheBackend::Redis);
        let redis = RedisConfig {
            url: "not-a-redis-url".to_string(),
        };

        let result = SimilarityStoreFactory::new().create(&config, &redis).await;
        assert!(matches!(result, Err(DomainError::Cache { .. })));
    }
}
