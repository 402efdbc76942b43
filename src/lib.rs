//! semgraph
//!
//! Semantic result caching and two-tier entity extraction for graph-backed
//! retrieval:
//! - A similarity cache that serves answers for meaning-equivalent queries
//! - Rule-based entity extraction escalating to an LLM when it finds nothing
//! - Idempotent merging of extracted entities into a knowledge graph

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use domain::embedding::EmbeddingProvider;
use domain::extraction::EntityExtractor;
use domain::graph::GraphStore;
use domain::llm::LlmProvider;
use domain::semantic_cache::SimilarityCacheStore;
use domain::DomainError;
use infrastructure::embedding::OllamaEmbeddingProvider;
use infrastructure::extraction::{LlmEntityExtractor, RuleBasedExtractor};
use infrastructure::graph::GraphStoreFactory;
use infrastructure::llm::{HttpClient, OllamaProvider};
use infrastructure::semantic_cache::SimilarityStoreFactory;
use infrastructure::services::{
    CachePurgeTask, ExtractionService, FastTier, HealthService, SemanticCacheService,
};
use tracing::info;

/// Every component of the pipeline, wired once from configuration
#[derive(Debug)]
pub struct AppComponents {
    pub cache_store: Arc<dyn SimilarityCacheStore>,
    pub graph_store: Arc<dyn GraphStore>,
    pub embedding_provider: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LlmProvider>,
    pub cache_service: Arc<SemanticCacheService>,
    pub extraction_service: Arc<ExtractionService>,
    pub health_service: Arc<HealthService>,
    purge_interval: Option<std::time::Duration>,
}

impl AppComponents {
    /// Build all components for `config`
    ///
    /// Only an unusable fast extractor is tolerated; every other
    /// construction failure is returned.
    pub async fn build(config: &AppConfig) -> Result<Self, DomainError> {
        let http = HttpClient::with_timeout(config.ollama.timeout())?;

        let embedding_provider: Arc<dyn EmbeddingProvider> =
            Arc::new(OllamaEmbeddingProvider::with_base_url(
                http.clone(),
                config.ollama.embedding_model.clone(),
                config.cache.dimensions,
                config.ollama.base_url.clone(),
            ));

        if embedding_provider.dimensions() != config.cache.dimensions {
            return Err(DomainError::configuration(format!(
                "Embedding model {} produces {} dimensions but cache.dimensions is {}",
                config.ollama.embedding_model,
                embedding_provider.dimensions(),
                config.cache.dimensions
            )));
        }

        let llm: Arc<dyn LlmProvider> = Arc::new(
            OllamaProvider::with_base_url(
                http.clone(),
                config.ollama.model.clone(),
                config.ollama.base_url.clone(),
            )
            .with_temperature(config.ollama.temperature),
        );

        let extraction_llm: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::with_base_url(
            http,
            config.ollama.extraction_model().to_string(),
            config.ollama.base_url.clone(),
        ));

        let cache_store = SimilarityStoreFactory::new()
            .create(&config.cache, &config.redis)
            .await?;
        let graph_store = GraphStoreFactory::new().create(&config.graph).await?;

        let cache_service = Arc::new(SemanticCacheService::new(
            cache_store.clone(),
            embedding_provider.clone(),
            config.cache.clone(),
        ));

        let fast = FastTier::from_result(
            RuleBasedExtractor::new(
                &config.extraction.language,
                config.extraction.resources_dir.as_deref(),
            )
            .map(|extractor| Arc::new(extractor) as Arc<dyn EntityExtractor>),
        );

        let extraction_service = Arc::new(
            ExtractionService::new(
                fast,
                Arc::new(LlmEntityExtractor::new(extraction_llm)),
                graph_store.clone(),
            )
            .with_scope(config.graph.scope)
            .with_min_fast_entities(config.extraction.min_fast_entities),
        );

        let health_service = Arc::new(HealthService::new(
            cache_store.clone(),
            graph_store.clone(),
            embedding_provider.clone(),
        ));

        info!(
            cache_backend = cache_store.backend_name(),
            graph_backend = graph_store.backend_name(),
            embedding = embedding_provider.provider_name(),
            model = llm.model_name(),
            "Components initialized"
        );

        Ok(Self {
            cache_store,
            graph_store,
            embedding_provider,
            llm,
            cache_service,
            extraction_service,
            health_service,
            purge_interval: config.cache.purge_interval(),
        })
    }

    /// Start the periodic cache purge, unless disabled by configuration
    pub fn spawn_purge_task(&self) -> Option<CachePurgeTask> {
        self.purge_interval
            .map(|interval| CachePurgeTask::spawn(self.cache_store.clone(), interval))
    }
}
