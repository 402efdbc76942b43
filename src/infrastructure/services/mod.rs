//! Infrastructure services

mod cache_purge;
mod extraction_service;
mod health_service;
mod semantic_cache_service;

pub use cache_purge::CachePurgeTask;
pub use extraction_service::{ExtractionReport, ExtractionService, FastTier};
pub use health_service::{HealthCheck, HealthReport, HealthService, HealthStatus};
pub use semantic_cache_service::{CacheOptions, CacheOutcome, CacheStatus, SemanticCacheService};
