//! Similarity cache store implementations

mod factory;
mod in_memory;
mod redis;

pub use factory::SimilarityStoreFactory;
pub use in_memory::InMemorySimilarityStore;
pub use redis::{RedisConfig, RedisSimilarityStore};
