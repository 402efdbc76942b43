//! Semantic cache domain models and traits
//!
//! Answers are cached under the embedding of the query that produced them
//! and found again by cosine similarity rather than exact key matches.

mod clock;
mod config;
mod entry;
mod store;

pub use clock::{Clock, SystemClock};
pub use config::{CacheBackend, SemanticCacheConfig};
pub use entry::CacheEntry;
pub use store::{CacheHit, CacheStats, SimilarityCacheStore};

pub(crate) use store::SimilarityAverage;

#[cfg(test)]
pub use clock::mock::ManualClock;
