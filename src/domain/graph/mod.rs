//! Knowledge graph domain models and traits

mod model;
mod store;

pub use model::{
    GraphEdge, GraphNode, GraphScope, GraphWriteSummary, Namespace, Provenance, UpsertOutcome,
};
pub use store::GraphStore;
