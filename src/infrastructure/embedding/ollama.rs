//! Ollama embedding provider implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::HttpClientTrait;
use crate::domain::embedding::{Embedding, EmbeddingProvider};
use crate::domain::DomainError;
use crate::infrastructure::llm::DEFAULT_OLLAMA_BASE_URL;

/// Known Ollama embedding models and their dimensions
const EMBEDDING_MODELS: &[(&str, usize)] = &[
    ("nomic-embed-text", 768),
    ("mxbai-embed-large", 1024),
    ("all-minilm", 384),
];

/// Ollama embedding provider
#[derive(Debug)]
pub struct OllamaEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl<C: HttpClientTrait> OllamaEmbeddingProvider<C> {
    /// Create a provider for a model, using its known dimensionality
    /// (or `fallback_dimensions` for unknown models)
    pub fn new(client: C, model: impl Into<String>, fallback_dimensions: usize) -> Self {
        Self::with_base_url(client, model, fallback_dimensions, DEFAULT_OLLAMA_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        model: impl Into<String>,
        fallback_dimensions: usize,
        base_url: impl Into<String>,
    ) -> Self {
        let model = model.into();
        let dimensions = known_dimensions(&model).unwrap_or(fallback_dimensions);

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model,
            dimensions,
        }
    }

    fn embeddings_url(&self) -> String {
        format!("{}/api/embeddings", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![("Content-Type", "application/json")]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<Embedding, DomainError> {
        let response: OllamaEmbeddingResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("ollama", format!("Failed to parse embedding response: {}", e))
        })?;

        if response.embedding.is_empty() {
            return Err(DomainError::provider("ollama", "Empty embedding in response"));
        }

        if response.embedding.len() != self.dimensions {
            return Err(DomainError::provider(
                "ollama",
                format!(
                    "Model {} returned {} dimensions, expected {}",
                    self.model,
                    response.embedding.len(),
                    self.dimensions
                ),
            ));
        }

        Ok(Embedding::new(self.model.clone(), response.embedding))
    }
}

fn known_dimensions(model: &str) -> Option<usize> {
    let base = model.split(':').next().unwrap_or(model);

    EMBEDDING_MODELS
        .iter()
        .find(|(name, _)| *name == base)
        .map(|(_, dims)| *dims)
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OllamaEmbeddingProvider<C> {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        let url = self.embeddings_url();
        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
        });

        let response = self.client.post_json(&url, self.headers(), &body).await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}
