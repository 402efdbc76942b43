//! Domain layer - Core models, traits and errors

pub mod embedding;
pub mod error;
pub mod extraction;
pub mod graph;
pub mod llm;
pub mod semantic_cache;

pub use error::DomainError;
