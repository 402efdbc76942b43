//! Graph store factory for runtime backend selection

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::domain::graph::{GraphScope, GraphStore};
use crate::domain::DomainError;

use super::in_memory::InMemoryGraphStore;
use super::neo4j::{Neo4jConfig, Neo4jGraphStore};

/// Knowledge graph backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphBackend {
    #[default]
    InMemory,
    Neo4j,
}

impl std::fmt::Display for GraphBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphBackend::InMemory => write!(f, "in_memory"),
            GraphBackend::Neo4j => write!(f, "neo4j"),
        }
    }
}

/// Knowledge graph settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub backend: GraphBackend,
    /// Namespace granularity of graph writes
    #[serde(default)]
    pub scope: GraphScope,
    #[serde(flatten)]
    pub neo4j: Neo4jConfig,
}

/// Factory for creating graph stores
#[derive(Debug, Default)]
pub struct GraphStoreFactory;

impl GraphStoreFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates the store selected by `config.backend`
    pub async fn create(&self, config: &GraphConfig) -> Result<Arc<dyn GraphStore>, DomainError> {
        info!(backend = %config.backend, scope = ?config.scope, "Creating knowledge graph store");

        match config.backend {
            GraphBackend::InMemory => Ok(Arc::new(InMemoryGraphStore::new())),
            GraphBackend::Neo4j => Ok(Arc::new(Neo4jGraphStore::connect(&config.neo4j).await?)),
        }
    }
}
