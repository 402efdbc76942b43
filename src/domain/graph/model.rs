//! Knowledge graph nodes, edges and namespaces

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::extraction::{EntityKey, EntityType, ExtractedEntity, ExtractedRelation};
use crate::domain::DomainError;

/// Granularity of the namespace graph writes go to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphScope {
    #[default]
    User,
    Document,
}

/// Scope every node and edge belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace(String);

impl Namespace {
    /// Derive the namespace for a write according to the configured scope
    pub fn for_scope(
        scope: GraphScope,
        user_id: &str,
        document_id: &str,
    ) -> Result<Self, DomainError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(DomainError::validation("user_id must not be empty"));
        }

        match scope {
            GraphScope::User => Ok(Self(format!("user:{}", user_id))),
            GraphScope::Document => {
                let document_id = document_id.trim();
                if document_id.is_empty() {
                    return Err(DomainError::validation("document_id must not be empty"));
                }
                Ok(Self(format!("user:{}/doc:{}", user_id, document_id)))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where and when a node or edge was observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub document_id: String,
    pub seen_at: DateTime<Utc>,
}

impl Provenance {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            seen_at: Utc::now(),
        }
    }
}

/// Entity node, identified by its key within a namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub key: EntityKey,
    pub display_name: String,
}

impl GraphNode {
    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn entity_type(&self) -> EntityType {
        self.key.entity_type
    }
}

impl From<&ExtractedEntity> for GraphNode {
    fn from(entity: &ExtractedEntity) -> Self {
        Self {
            key: entity.key(),
            display_name: entity.display_name.clone(),
        }
    }
}

/// Typed directed edge between two nodes of the same namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: EntityKey,
    pub relation_type: String,
    pub target: EntityKey,
}

impl From<&ExtractedRelation> for GraphEdge {
    fn from(relation: &ExtractedRelation) -> Self {
        Self {
            source: relation.source.clone(),
            relation_type: relation.relation_type.clone(),
            target: relation.target.clone(),
        }
    }
}

/// Whether an upsert created a new node or edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Existing,
}

impl UpsertOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, UpsertOutcome::Created)
    }
}

/// Counts of nodes and edges newly created by a graph build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphWriteSummary {
    pub nodes_created: usize,
    pub edges_created: usize,
}

impl GraphWriteSummary {
    pub fn as_tuple(&self) -> (usize, usize) {
        (self.nodes_created, self.edges_created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_user_scope() {
        let ns = Namespace::for_scope(GraphScope::User, "u1", "doc-9").unwrap();
        assert_eq!(ns.as_str(), "user:u1");
    }

    #[test]
    fn test_namespace_document_scope() {
        let ns = Namespace::for_scope(GraphScope::Document, " u1 ", "doc-9").unwrap();
        assert_eq!(ns.to_string(), "user:u1/doc:doc-9");
    }

    #[test]
    fn test_namespace_requires_ids() {
        assert!(Namespace::for_scope(GraphScope::User, "  ", "d").is_err());
        assert!(Namespace::for_scope(GraphScope::Document, "u", "").is_err());
        assert!(Namespace::for_scope(GraphScope::User, "u", "").is_ok());
    }

    #[test]
    fn test_node_from_entity() {
        let entity = ExtractedEntity::new(" Ada  Lovelace ", EntityType::Person);
        let node = GraphNode::from(&entity);

        assert_eq!(node.name(), "ada lovelace");
        assert_eq!(node.display_name, "Ada  Lovelace");
        assert_eq!(node.entity_type(), EntityType::Person);
    }

    #[test]
    fn test_scope_deserialize() {
        let scope: GraphScope = serde_json::from_str("\"document\"").unwrap();
        assert_eq!(scope, GraphScope::Document);
    }
}
