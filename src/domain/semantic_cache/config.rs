//! Semantic cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Backing store used for cached answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    InMemory,
    Redis,
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackend::InMemory => write!(f, "in_memory"),
            CacheBackend::Redis => write!(f, "redis"),
        }
    }
}

/// Configuration for semantic caching
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SemanticCacheConfig {
    /// Whether semantic caching is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum cosine similarity for a cache hit (0.0 to 1.0)
    #[serde(default = "default_similarity_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub similarity_threshold: f32,

    /// Maximum number of entries to store
    #[serde(default = "default_max_entries")]
    #[validate(range(min = 1))]
    pub max_entries: usize,

    /// Time-to-live for cached entries in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Dimensionality every cached embedding must have
    #[serde(default = "default_dimensions")]
    #[validate(range(min = 1))]
    pub dimensions: usize,

    /// Interval of the background purge task in seconds (0 disables it)
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,

    /// Backing store
    #[serde(default)]
    pub backend: CacheBackend,

    /// Namespace prefix for cache keys
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_enabled() -> bool {
    true
}

fn default_similarity_threshold() -> f32 {
    0.95
}

fn default_max_entries() -> usize {
    10_000
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_dimensions() -> usize {
    768
}

fn default_purge_interval_secs() -> u64 {
    300
}

fn default_namespace() -> String {
    "semantic:answers".to_string()
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            similarity_threshold: default_similarity_threshold(),
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
            dimensions: default_dimensions(),
            purge_interval_secs: default_purge_interval_secs(),
            backend: CacheBackend::default(),
            namespace: default_namespace(),
        }
    }
}

impl SemanticCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get TTL as Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Purge interval, `None` when the background purge is disabled
    pub fn purge_interval(&self) -> Option<Duration> {
        (self.purge_interval_secs > 0).then(|| Duration::from_secs(self.purge_interval_secs))
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the similarity threshold, clamped to [0, 1]
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_backend(mut self, backend: CacheBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SemanticCacheConfig::default();

        assert!(config.enabled);
        assert!((config.similarity_threshold - 0.95).abs() < f32::EPSILON);
        assert_eq!(config.max_entries, 10_000);
        assert_eq!(config.ttl(), Duration::from_secs(3600));
        assert_eq!(config.dimensions, 768);
        assert_eq!(config.backend, CacheBackend::InMemory);
        assert_eq!(config.purge_interval(), Some(Duration::from_secs(300)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SemanticCacheConfig::new()
            .with_enabled(false)
            .with_similarity_threshold(0.9)
            .with_max_entries(50)
            .with_ttl(Duration::from_secs(60))
            .with_dimensions(3)
            .with_backend(CacheBackend::Redis)
            .with_namespace("test:ns");

        assert!(!config.enabled);
        assert!((config.similarity_threshold - 0.9).abs() < 0.001);
        assert_eq!(config.max_entries, 50);
        assert_eq!(config.ttl_secs, 60);
        assert_eq!(config.dimensions, 3);
        assert_eq!(config.backend.to_string(), "redis");
        assert_eq!(config.namespace, "test:ns");
    }

    #[test]
    fn test_similarity_threshold_clamped() {
        let config = SemanticCacheConfig::new().with_similarity_threshold(1.5);
        assert_eq!(config.similarity_threshold, 1.0);

        let config = SemanticCacheConfig::new().with_similarity_threshold(-0.5);
        assert_eq!(config.similarity_threshold, 0.0);
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let mut config = SemanticCacheConfig::default();
        config.similarity_threshold = 1.2;
        assert!(config.validate().is_err());

        let config = SemanticCacheConfig::default().with_max_entries(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_purge_interval_disables_task() {
        let mut config = SemanticCacheConfig::default();
        config.purge_interval_secs = 0;
        assert!(config.purge_interval().is_none());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: SemanticCacheConfig =
            serde_json::from_str(r#"{"backend": "redis", "ttl_secs": 10}"#).unwrap();

        assert_eq!(config.backend, CacheBackend::Redis);
        assert_eq!(config.ttl_secs, 10);
        assert_eq!(config.max_entries, 10_000);
    }
}
