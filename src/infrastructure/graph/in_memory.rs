//! In-memory knowledge graph store

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::extraction::EntityKey;
use crate::domain::graph::{GraphEdge, GraphNode, GraphStore, Namespace, Provenance, UpsertOutcome};
use crate::domain::DomainError;

/// Provenance kept for every node and edge
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRecord {
    pub display_name: String,
    pub document_ids: BTreeSet<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl GraphRecord {
    fn new(display_name: String, provenance: &Provenance) -> Self {
        Self {
            display_name,
            document_ids: BTreeSet::from([provenance.document_id.clone()]),
            first_seen: provenance.seen_at,
            last_seen: provenance.seen_at,
        }
    }

    fn touch(&mut self, provenance: &Provenance) {
        self.document_ids.insert(provenance.document_id.clone());
        self.last_seen = provenance.seen_at;
    }
}

type NodeId = (Namespace, EntityKey);
type EdgeId = (Namespace, GraphEdge);

/// Knowledge graph held in process memory
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    nodes: RwLock<HashMap<NodeId, GraphRecord>>,
    edges: RwLock<HashMap<EdgeId, GraphRecord>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self, namespace: &Namespace) -> usize {
        self.nodes
            .read()
            .map(|nodes| nodes.keys().filter(|(ns, _)| ns == namespace).count())
            .unwrap_or_default()
    }

    pub fn edge_count(&self, namespace: &Namespace) -> usize {
        self.edges
            .read()
            .map(|edges| edges.keys().filter(|(ns, _)| ns == namespace).count())
            .unwrap_or_default()
    }

    pub fn node(&self, namespace: &Namespace, key: &EntityKey) -> Option<GraphRecord> {
        self.nodes
            .read()
            .ok()?
            .get(&(namespace.clone(), key.clone()))
            .cloned()
    }

    pub fn edge(&self, namespace: &Namespace, edge: &GraphEdge) -> Option<GraphRecord> {
        self.edges
            .read()
            .ok()?
            .get(&(namespace.clone(), edge.clone()))
            .cloned()
    }

    fn merge_node(
        nodes: &mut HashMap<NodeId, GraphRecord>,
        id: NodeId,
        display_name: &str,
        provenance: &Provenance,
    ) -> UpsertOutcome {
        match nodes.get_mut(&id) {
            Some(record) => {
                record.touch(provenance);
                UpsertOutcome::Existing
            }
            None => {
                nodes.insert(id, GraphRecord::new(display_name.to_string(), provenance));
                UpsertOutcome::Created
            }
        }
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn upsert_node(
        &self,
        namespace: &Namespace,
        node: &GraphNode,
        provenance: &Provenance,
    ) -> Result<UpsertOutcome, DomainError> {
        let mut nodes = self
            .nodes
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        Ok(Self::merge_node(
            &mut nodes,
            (namespace.clone(), node.key.clone()),
            &node.display_name,
            provenance,
        ))
    }

    async fn upsert_edge(
        &self,
        namespace: &Namespace,
        edge: &GraphEdge,
        provenance: &Provenance,
    ) -> Result<UpsertOutcome, DomainError> {
        {
            let mut nodes = self.nodes.write().map_err(|e| {
                DomainError::internal(format!("Failed to acquire write lock: {}", e))
            })?;

            for endpoint in [&edge.source, &edge.target] {
                let id = (namespace.clone(), endpoint.clone());
                if !nodes.contains_key(&id) {
                    Self::merge_node(&mut nodes, id, &endpoint.name, provenance);
                }
            }
        }

        let mut edges = self
            .edges
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let id = (namespace.clone(), edge.clone());
        match edges.get_mut(&id) {
            Some(record) => {
                record.touch(provenance);
                Ok(UpsertOutcome::Existing)
            }
            None => {
                edges.insert(id, GraphRecord::new(edge.relation_type.clone(), provenance));
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}
