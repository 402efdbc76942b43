//! Neo4j knowledge graph store

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query};
use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::graph::{GraphEdge, GraphNode, GraphStore, Namespace, Provenance, UpsertOutcome};
use crate::domain::DomainError;

/// Neo4j connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_username() -> String {
    "neo4j".to_string()
}

fn default_pool_size() -> usize {
    10
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            username: default_username(),
            password: String::new(),
            database: None,
            pool_size: default_pool_size(),
        }
    }
}

const UPSERT_NODE: &str = "\
MERGE (e:Entity {namespace: $namespace, name: $name, type: $type})
ON CREATE SET e.display_name = $display_name, e.created_at = $seen_at,
              e.last_seen = $seen_at, e.document_ids = [$document_id]
ON MATCH SET e.last_seen = $seen_at,
             e.document_ids = CASE WHEN $document_id IN e.document_ids
                                   THEN e.document_ids
                                   ELSE e.document_ids + $document_id END
RETURN e.created_at = $seen_at AS created";

/// Knowledge graph store on Neo4j
///
/// Nodes are `:Entity` nodes keyed by `(namespace, name, type)`; edges are
/// relationships typed by their relation label. Both are written with
/// `MERGE` so repeated writes only refresh provenance.
pub struct Neo4jGraphStore {
    graph: Arc<Graph>,
    uri: String,
}

impl fmt::Debug for Neo4jGraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neo4jGraphStore")
            .field("uri", &self.uri)
            .field("graph", &"<Graph>")
            .finish()
    }
}

impl Neo4jGraphStore {
    pub async fn connect(config: &Neo4jConfig) -> Result<Self, DomainError> {
        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.username.as_str())
            .password(config.password.as_str())
            .max_connections(config.pool_size);

        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }

        let neo4j_config = builder
            .build()
            .map_err(|e| DomainError::configuration(format!("Invalid Neo4j config: {}", e)))?;

        let graph = Graph::connect(neo4j_config)
            .await
            .map_err(|e| DomainError::graph(format!("Failed to connect to Neo4j: {}", e)))?;

        let store = Self {
            graph: Arc::new(graph),
            uri: config.uri.clone(),
        };

        store.ensure_constraints().await;
        info!(uri = %config.uri, "Connected to Neo4j");

        Ok(store)
    }

    async fn ensure_constraints(&self) {
        let query = Query::new(
            "CREATE CONSTRAINT entity_identity IF NOT EXISTS \
             FOR (e:Entity) REQUIRE (e.namespace, e.name, e.type) IS UNIQUE"
                .to_string(),
        );

        if let Err(e) = self.graph.run(query).await {
            warn!(error = %e, "Could not create entity uniqueness constraint");
        }
    }

    async fn run_upsert(&self, query: Query) -> Result<UpsertOutcome, DomainError> {
        let mut result = self
            .graph
            .execute(query)
            .await
            .map_err(|e| DomainError::graph(format!("Upsert failed: {}", e)))?;

        let row = result
            .next()
            .await
            .map_err(|e| DomainError::graph(format!("Failed to read upsert result: {}", e)))?
            .ok_or_else(|| DomainError::graph("Upsert returned no rows"))?;

        let created: bool = row
            .get("created")
            .map_err(|e| DomainError::graph(format!("Malformed upsert result: {}", e)))?;

        Ok(if created {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Existing
        })
    }
}

/// Relationship types cannot be parameters; the normalized label only holds
/// alphanumerics and underscores, and backticks are stripped regardless.
fn edge_upsert_cypher(relation_type: &str) -> String {
    let relation_type: String = relation_type.chars().filter(|c| *c != '`').collect();

    format!(
        "\
MERGE (s:Entity {{namespace: $namespace, name: $source_name, type: $source_type}})
ON CREATE SET s.display_name = $source_name, s.created_at = $seen_at,
              s.last_seen = $seen_at, s.document_ids = [$document_id]
MERGE (t:Entity {{namespace: $namespace, name: $target_name, type: $target_type}})
ON CREATE SET t.display_name = $target_name, t.created_at = $seen_at,
              t.last_seen = $seen_at, t.document_ids = [$document_id]
MERGE (s)-[r:`{relation_type}`]->(t)
ON CREATE SET r.created_at = $seen_at, r.last_seen = $seen_at, r.document_ids = [$document_id]
ON MATCH SET r.last_seen = $seen_at,
             r.document_ids = CASE WHEN $document_id IN r.document_ids
                                   THEN r.document_ids
                                   ELSE r.document_ids + $document_id END
RETURN r.created_at = $seen_at AS created"
    )
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn upsert_node(
        &self,
        namespace: &Namespace,
        node: &GraphNode,
        provenance: &Provenance,
    ) -> Result<UpsertOutcome, DomainError> {
        let query = Query::new(UPSERT_NODE.to_string())
            .param("namespace", namespace.as_str())
            .param("name", node.name())
            .param("type", node.entity_type().as_str())
            .param("display_name", node.display_name.as_str())
            .param("document_id", provenance.document_id.as_str())
            .param("seen_at", provenance.seen_at.to_rfc3339());

        self.run_upsert(query).await
    }

    async fn upsert_edge(
        &self,
        namespace: &Namespace,
        edge: &GraphEdge,
        provenance: &Provenance,
    ) -> Result<UpsertOutcome, DomainError> {
        let query = Query::new(edge_upsert_cypher(&edge.relation_type))
            .param("namespace", namespace.as_str())
            .param("source_name", edge.source.name.as_str())
            .param("source_type", edge.source.entity_type.as_str())
            .param("target_name", edge.target.name.as_str())
            .param("target_type", edge.target.entity_type.as_str())
            .param("document_id", provenance.document_id.as_str())
            .param("seen_at", provenance.seen_at.to_rfc3339());

        self.run_upsert(query).await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        let mut result = self
            .graph
            .execute(Query::new("RETURN 1 AS ok".to_string()))
            .await
            .map_err(|e| DomainError::graph(format!("Neo4j ping failed: {}", e)))?;

        result
            .next()
            .await
            .map_err(|e| DomainError::graph(format!("Neo4j ping failed: {}", e)))?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "neo4j"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::extraction::{EntityKey, EntityType};
    use crate::domain::graph::GraphScope;

    #[test]
    fn test_default_config() {
        let config = Neo4jConfig::default();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.username, "neo4j");
        assert!(config.database.is_none());
    }

    #[test]
    fn test_edge_cypher_uses_sanitized_type() {
        let cypher = edge_upsert_cypher("WORKS`_FOR");
        assert!(cypher.contains("[r:`WORKS_FOR`]"));
    }

    #[tokio::test]
    #[ignore = "Requires running Neo4j instance"]
    async fn test_neo4j_upserts_are_idempotent() {
        let config = Neo4jConfig {
            password: "password".to_string(),
            ..Default::default()
        };
        let store = Neo4jGraphStore::connect(&config).await.unwrap();
        let namespace = Namespace::for_scope(
            GraphScope::Document,
            "test-user",
            &uuid::Uuid::new_v4().to_string(),
        )
        .unwrap();

        let node = GraphNode {
            key: EntityKey::new("Paris", EntityType::Location),
            display_name: "Paris".to_string(),
        };

        let first = store
            .upsert_node(&namespace, &node, &Provenance::new("d1"))
            .await
            .unwrap();
        let second = store
            .upsert_node(&namespace, &node, &Provenance::new("d1"))
            .await
            .unwrap();

        assert!(first.is_created());
        assert!(!second.is_created());
        assert!(store.ping().await.is_ok());
    }
}
