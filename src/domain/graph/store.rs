//! Knowledge graph write interface

use std::fmt::Debug;

use async_trait::async_trait;

use super::{GraphEdge, GraphNode, Namespace, Provenance, UpsertOutcome};
use crate::domain::DomainError;

/// Idempotent knowledge graph writes
///
/// Re-upserting an existing node or edge never duplicates it; it only
/// refreshes its provenance.
#[async_trait]
pub trait GraphStore: Send + Sync + Debug {
    async fn upsert_node(
        &self,
        namespace: &Namespace,
        node: &GraphNode,
        provenance: &Provenance,
    ) -> Result<UpsertOutcome, DomainError>;

    /// Upsert an edge, creating missing endpoint nodes
    async fn upsert_edge(
        &self,
        namespace: &Namespace,
        edge: &GraphEdge,
        provenance: &Provenance,
    ) -> Result<UpsertOutcome, DomainError>;

    async fn ping(&self) -> Result<(), DomainError>;

    fn backend_name(&self) -> &'static str;
}
