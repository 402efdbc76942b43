use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use validator::Validate;

use crate::domain::semantic_cache::SemanticCacheConfig;
use crate::domain::DomainError;
use crate::infrastructure::graph::GraphConfig;
use crate::infrastructure::llm::DEFAULT_OLLAMA_BASE_URL;
use crate::infrastructure::logging::LoggingConfig;
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::semantic_cache::RedisConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    #[validate(nested)]
    pub cache: SemanticCacheConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    #[validate(nested)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    #[validate(nested)]
    pub extraction: ExtractionConfig,
}

/// Ollama server used for embeddings, answers and precise extraction
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OllamaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Chat model answering questions
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Small chat model used by the precise extractor
    #[serde(default = "default_extraction_model")]
    pub extraction_model: String,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_OLLAMA_BASE_URL.to_string()
}

fn default_model() -> String {
    "llama3.1".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_extraction_model() -> String {
    "qwen2:1.5b".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            extraction_model: default_extraction_model(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OllamaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn extraction_model(&self) -> &str {
        &self.extraction_model
    }
}

/// Entity extraction settings
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExtractionConfig {
    /// Language of the fast extractor's resources
    #[serde(default = "default_language")]
    pub language: String,
    /// Directory holding `<language>.json` resource files
    #[serde(default)]
    pub resources_dir: Option<PathBuf>,
    /// Fewer fast-tier entities than this escalates to the precise tier
    #[serde(default = "default_min_fast_entities")]
    #[validate(range(min = 1))]
    pub min_fast_entities: usize,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_min_fast_entities() -> usize {
    1
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            resources_dir: None,
            min_fast_entities: default_min_fast_entities(),
        }
    }
}

impl AppConfig {
    /// Load from `config/default`, `config/local` and `APP__*` variables
    pub fn load() -> Result<Self, DomainError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, DomainError> {
        let mut config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DomainError::configuration(format!("Failed to load config: {}", e)))?;

        config.cache.similarity_threshold = config.cache.similarity_threshold.clamp(0.0, 1.0);

        config
            .validate()
            .map_err(|e| DomainError::configuration(format!("Invalid config: {}", e)))?;

        Ok(config)
    }
}
