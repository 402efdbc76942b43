//! Embedding provider implementations

mod ollama;

pub use ollama::OllamaEmbeddingProvider;

// Re-export HTTP client for use by embedding providers
pub use super::llm::{HttpClient, HttpClientTrait};
