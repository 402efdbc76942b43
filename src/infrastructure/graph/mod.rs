//! Knowledge graph store implementations

mod factory;
mod in_memory;
mod neo4j;

pub use factory::{GraphBackend, GraphConfig, GraphStoreFactory};
pub use in_memory::{GraphRecord, InMemoryGraphStore};
pub use neo4j::{Neo4jConfig, Neo4jGraphStore};
