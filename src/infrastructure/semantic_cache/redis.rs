//! Redis similarity cache store

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::embedding::cosine_similarity;
use crate::domain::semantic_cache::{
    CacheEntry, CacheHit, CacheStats, Clock, SimilarityAverage, SimilarityCacheStore, SystemClock,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_cache_evictions;

/// Redis connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    #[serde(default = "default_url")]
    pub url: String,
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

/// Similarity cache store on Redis
///
/// Entries are JSON records under `<prefix>:entry:<id>` written with
/// `SET EX`, so Redis expires them on its own. Recency lives in the
/// sorted set `<prefix>:lru` scored by a tick that only grows. Writes are
/// serialized in-process so capacity checks and evictions do not race.
pub struct RedisSimilarityStore {
    connection: ConnectionManager,
    prefix: String,
    max_entries: usize,
    dimensions: usize,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    similarity: RwLock<SimilarityAverage>,
}

impl fmt::Debug for RedisSimilarityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSimilarityStore")
            .field("prefix", &self.prefix)
            .field("max_entries", &self.max_entries)
            .field("dimensions", &self.dimensions)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisSimilarityStore {
    /// Connect to Redis
    pub async fn connect(
        config: &RedisConfig,
        prefix: impl Into<String>,
        max_entries: usize,
        dimensions: usize,
    ) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            prefix: prefix.into(),
            max_entries: max_entries.max(1),
            dimensions,
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            similarity: RwLock::new(SimilarityAverage::default()),
        })
    }

    fn entry_key(&self, id: &str) -> String {
        format!("{}:entry:{}", self.prefix, id)
    }

    fn lru_key(&self) -> String {
        format!("{}:lru", self.prefix)
    }

    fn tick_key(&self) -> String {
        format!("{}:tick", self.prefix)
    }

    async fn next_tick(&self, conn: &mut ConnectionManager) -> Result<i64, DomainError> {
        conn.incr(self.tick_key(), 1)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to advance recency tick: {}", e)))
    }

    /// Load every indexed entry; ids whose record is gone are returned separately
    async fn load_entries(
        &self,
        conn: &mut ConnectionManager,
    ) -> Result<(Vec<CacheEntry>, Vec<String>), DomainError> {
        let ids: Vec<String> = conn
            .zrange(self.lru_key(), 0, -1)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to read recency index: {}", e)))?;

        if ids.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let keys: Vec<String> = ids.iter().map(|id| self.entry_key(id)).collect();
        let records: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to read entries: {}", e)))?;

        let mut entries = Vec::with_capacity(records.len());
        let mut missing = Vec::new();

        for (id, record) in ids.into_iter().zip(records) {
            match record {
                Some(json) => match serde_json::from_str::<CacheEntry>(&json) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => {
                        warn!(id = %id, error = %e, "Skipping malformed cache record");
                    }
                },
                None => missing.push(id),
            }
        }

        Ok((entries, missing))
    }

    /// Drop index members whose records Redis already expired
    async fn remove_from_index(
        &self,
        conn: &mut ConnectionManager,
        ids: &[String],
    ) -> Result<usize, DomainError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let removed: usize = conn
            .zrem(self.lru_key(), ids)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to update recency index: {}", e)))?;

        self.expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        Ok(removed)
    }

    async fn index_len(&self, conn: &mut ConnectionManager) -> Result<usize, DomainError> {
        conn.zcard(self.lru_key())
            .await
            .map_err(|e| DomainError::cache(format!("Failed to count entries: {}", e)))
    }

    async fn purge_locked(&self, conn: &mut ConnectionManager) -> Result<usize, DomainError> {
        let now = self.clock.now();
        let (entries, mut stale) = self.load_entries(conn).await?;

        let expired: Vec<String> = entries
            .iter()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.id().to_string())
            .collect();

        if !expired.is_empty() {
            let keys: Vec<String> = expired.iter().map(|id| self.entry_key(id)).collect();
            let _: usize = conn
                .del(&keys)
                .await
                .map_err(|e| DomainError::cache(format!("Failed to delete entries: {}", e)))?;
        }

        stale.extend(expired);
        self.remove_from_index(conn, &stale).await
    }

    /// Bump an indexed entry to the newest tick
    ///
    /// `XX` keeps an id removed by a concurrent eviction out of the index.
    async fn refresh_recency(
        &self,
        conn: &mut ConnectionManager,
        id: &str,
    ) -> Result<bool, DomainError> {
        let tick = self.next_tick(conn).await?;
        let changed: usize = redis::cmd("ZADD")
            .arg(self.lru_key())
            .arg("XX")
            .arg("CH")
            .arg(tick)
            .arg(id)
            .query_async(conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to refresh recency: {}", e)))?;

        Ok(changed > 0)
    }

    async fn scan(&self, embedding: &[f32], threshold: f32) -> Result<Option<CacheHit>, DomainError> {
        let mut conn = self.connection.clone();
        let now = self.clock.now();

        let (entries, _) = self.load_entries(&mut conn).await?;

        let best = entries
            .into_iter()
            .filter(|entry| !entry.is_expired_at(now))
            .filter(|entry| entry.embedding().len() == embedding.len())
            .map(|entry| {
                let similarity = cosine_similarity(embedding, entry.embedding());
                (entry, similarity)
            })
            // Later index positions are more recent, so `max_by` keeps them on ties
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((entry, similarity)) if similarity >= threshold => {
                if !self.refresh_recency(&mut conn, entry.id()).await? {
                    debug!(id = entry.id(), "Matched entry was evicted during lookup");
                }

                Ok(Some(CacheHit { entry, similarity }))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl SimilarityCacheStore for RedisSimilarityStore {
    async fn put(
        &self,
        embedding: Vec<f32>,
        query_text: &str,
        payload: String,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        if embedding.len() != self.dimensions {
            return Err(DomainError::validation(format!(
                "Embedding has {} dimensions, expected {}",
                embedding.len(),
                self.dimensions
            )));
        }

        let entry = CacheEntry::new(embedding, query_text, payload, self.clock.now(), ttl);
        let record = serde_json::to_string(&entry)
            .map_err(|e| DomainError::cache(format!("Failed to serialize entry: {}", e)))?;

        let _guard = self.write_lock.lock().await;
        let mut conn = self.connection.clone();

        if self.index_len(&mut conn).await? >= self.max_entries {
            let purged = self.purge_locked(&mut conn).await?;
            if purged > 0 {
                debug!(purged, "Purged expired entries to make room");
            }

            let mut evicted = 0u64;
            while self.index_len(&mut conn).await? >= self.max_entries {
                let popped: Vec<(String, f64)> = conn
                    .zpopmin(self.lru_key(), 1)
                    .await
                    .map_err(|e| DomainError::cache(format!("Failed to evict entry: {}", e)))?;

                let Some((victim, _)) = popped.into_iter().next() else {
                    break;
                };

                let _: usize = conn
                    .del(self.entry_key(&victim))
                    .await
                    .map_err(|e| DomainError::cache(format!("Failed to evict entry: {}", e)))?;
                evicted += 1;
            }

            if evicted > 0 {
                self.evictions.fetch_add(evicted, Ordering::Relaxed);
                record_cache_evictions(evicted);
            }
        }

        let ttl_secs = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(self.entry_key(entry.id()), record, ttl_secs)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to store entry: {}", e)))?;

        let tick = self.next_tick(&mut conn).await?;
        let _: usize = conn
            .zadd(self.lru_key(), entry.id(), tick)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to index entry: {}", e)))?;

        Ok(())
    }

    async fn lookup(
        &self,
        embedding: &[f32],
        threshold: f32,
    ) -> Result<Option<CacheHit>, DomainError> {
        let result = match self.scan(embedding, threshold).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Redis lookup failed, treating as miss");
                None
            }
        };

        match &result {
            Some(hit) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut avg) = self.similarity.write() {
                    avg.record(hit.similarity);
                }
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(result)
    }

    async fn purge_expired(&self) -> Result<usize, DomainError> {
        let _guard = self.write_lock.lock().await;
        let mut conn = self.connection.clone();

        self.purge_locked(&mut conn).await
    }

    async fn len(&self) -> Result<usize, DomainError> {
        let mut conn = self.connection.clone();
        self.index_len(&mut conn).await
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
        let _guard = self.write_lock.lock().await;
        let mut conn = self.connection.clone();

        let ids: Vec<String> = conn
            .zrange(self.lru_key(), 0, -1)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to read recency index: {}", e)))?;

        let mut keys: Vec<String> = ids.iter().map(|id| self.entry_key(id)).collect();
        keys.push(self.lru_key());
        keys.push(self.tick_key());

        let _: usize = conn
            .del(&keys)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to clear cache: {}", e)))?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Redis ping failed: {}", e)))?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
