//! Readiness checks for the backends the pipeline depends on

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::domain::embedding::EmbeddingProvider;
use crate::domain::graph::GraphStore;
use crate::domain::semantic_cache::SimilarityCacheStore;
use crate::domain::DomainError;

/// Health check status
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health check
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub backend: &'static str,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

/// Readiness report over all components
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub checks: Vec<HealthCheck>,
    pub latency_ms: u64,
}

/// Pings the cache store, the graph store and the embedding provider
///
/// The graph store is required: its failure makes the report unhealthy.
/// The cache and the embedding provider only degrade it.
#[derive(Debug)]
pub struct HealthService {
    cache: Arc<dyn SimilarityCacheStore>,
    graph: Arc<dyn GraphStore>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
}

impl HealthService {
    pub fn new(
        cache: Arc<dyn SimilarityCacheStore>,
        graph: Arc<dyn GraphStore>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            cache,
            graph,
            embedding_provider,
        }
    }

    pub async fn readiness(&self) -> HealthReport {
        let start = Instant::now();

        let (cache_check, graph_check, embedding_check) = futures::join!(
            check(
                "semantic_cache",
                self.cache.backend_name(),
                HealthStatus::Degraded,
                self.cache.ping(),
            ),
            check(
                "knowledge_graph",
                self.graph.backend_name(),
                HealthStatus::Unhealthy,
                self.graph.ping(),
            ),
            check(
                "embedding_provider",
                self.embedding_provider.provider_name(),
                HealthStatus::Degraded,
                async { self.embedding_provider.embed("test").await.map(|_| ()) },
            ),
        );

        let checks = vec![cache_check, graph_check, embedding_check];
        let status = overall_status(&checks);

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks,
            latency_ms: start.elapsed().as_millis() as u64,
        }
    }
}

async fn check(
    name: &str,
    backend: &'static str,
    on_failure: HealthStatus,
    probe: impl std::future::Future<Output = Result<(), DomainError>>,
) -> HealthCheck {
    let start = Instant::now();
    let result = probe.await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => HealthCheck {
            name: name.to_string(),
            backend,
            status: HealthStatus::Healthy,
            message: None,
            latency_ms,
        },
        Err(e) => HealthCheck {
            name: name.to_string(),
            backend,
            status: on_failure,
            message: Some(e.to_string()),
            latency_ms,
        },
    }
}

fn overall_status(checks: &[HealthCheck]) -> HealthStatus {
    if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
        HealthStatus::Unhealthy
    } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}
