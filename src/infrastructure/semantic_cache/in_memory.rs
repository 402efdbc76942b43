//! In-memory similarity cache store

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::embedding::cosine_similarity;
use crate::domain::semantic_cache::{
    CacheEntry, CacheHit, CacheStats, Clock, SimilarityAverage, SimilarityCacheStore, SystemClock,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_cache_evictions;

#[derive(Debug)]
struct StoredEntry {
    entry: CacheEntry,
    last_used: AtomicU64,
}

/// In-memory similarity cache using linear search
///
/// All entries live behind one `RwLock`. Lookups share the read lock and
/// bump recency through per-entry atomics; inserts, eviction, purge and
/// clear take the write lock, so the entry count never exceeds capacity.
#[derive(Debug)]
pub struct InMemorySimilarityStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
    max_entries: usize,
    dimensions: usize,
    clock: Arc<dyn Clock>,
    tick: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    similarity: RwLock<SimilarityAverage>,
}

impl InMemorySimilarityStore {
    pub fn new(max_entries: usize, dimensions: usize) -> Self {
        Self::with_clock(max_entries, dimensions, Arc::new(SystemClock))
    }

    pub fn with_clock(max_entries: usize, dimensions: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            dimensions,
            clock,
            tick: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            similarity: RwLock::new(SimilarityAverage::default()),
        }
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn remove_expired(&self, entries: &mut HashMap<String, StoredEntry>) -> usize {
        let now = self.clock.now();
        let before = entries.len();

        entries.retain(|_, stored| !stored.entry.is_expired_at(now));

        let removed = before - entries.len();
        self.expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Make room for one entry: expired entries go first, then the least recently used
    fn make_room(&self, entries: &mut HashMap<String, StoredEntry>) {
        if entries.len() < self.max_entries {
            return;
        }

        let purged = self.remove_expired(entries);
        if purged > 0 {
            debug!(purged, "Purged expired entries to make room");
        }

        let mut evicted = 0u64;
        while entries.len() >= self.max_entries {
            let Some(victim) = entries
                .iter()
                .min_by_key(|(_, stored)| stored.last_used.load(Ordering::Relaxed))
                .map(|(id, _)| id.clone())
            else {
                break;
            };

            entries.remove(&victim);
            evicted += 1;
        }

        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            record_cache_evictions(evicted);
            debug!(evicted, "Evicted least recently used entries");
        }
    }

    fn check_dimensions(&self, embedding: &[f32]) -> Result<(), DomainError> {
        if embedding.len() != self.dimensions {
            return Err(DomainError::validation(format!(
                "Embedding has {} dimensions, expected {}",
                embedding.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SimilarityCacheStore for InMemorySimilarityStore {
    async fn put(
        &self,
        embedding: Vec<f32>,
        query_text: &str,
        payload: String,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        self.check_dimensions(&embedding)?;

        let entry = CacheEntry::new(embedding, query_text, payload, self.clock.now(), ttl);

        let mut entries = self.entries.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        self.make_room(&mut entries);

        let stored = StoredEntry {
            entry,
            last_used: AtomicU64::new(self.next_tick()),
        };
        entries.insert(stored.entry.id().to_string(), stored);

        Ok(())
    }

    async fn lookup(
        &self,
        embedding: &[f32],
        threshold: f32,
    ) -> Result<Option<CacheHit>, DomainError> {
        let entries = self.entries.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        let now = self.clock.now();

        let best = entries
            .values()
            .filter(|stored| !stored.entry.is_expired_at(now))
            .filter(|stored| stored.entry.embedding().len() == embedding.len())
            .map(|stored| {
                let similarity = cosine_similarity(embedding, stored.entry.embedding());
                (stored, similarity)
            })
            .max_by(|(a, sim_a), (b, sim_b)| {
                sim_a
                    .partial_cmp(sim_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| {
                        a.last_used
                            .load(Ordering::Relaxed)
                            .cmp(&b.last_used.load(Ordering::Relaxed))
                    })
            });

        match best {
            Some((stored, similarity)) if similarity >= threshold => {
                stored.last_used.store(self.next_tick(), Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);

                if let Ok(mut avg) = self.similarity.write() {
                    avg.record(similarity);
                }

                Ok(Some(CacheHit {
                    entry: stored.entry.clone(),
                    similarity,
                }))
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn purge_expired(&self) -> Result<usize, DomainError> {
        let mut entries = self.entries.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        Ok(self.remove_expired(&mut entries))
    }

    async fn len(&self) -> Result<usize, DomainError> {
        let entries = self.entries.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(entries.len())
    }

    async fn stats(&self) -> Result<CacheStats, DomainError> {
        let entries = self.len().await?;
        let avg_hit_similarity = self
            .similarity
            .read()
            .map(|avg| avg.value())
            .unwrap_or_default();

        Ok(CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            avg_hit_similarity,
        })
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut entries = self.entries.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        entries.clear();
        Ok(())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}
