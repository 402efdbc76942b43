//! Cached answer entries

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// An immutable cached answer keyed by the embedding of the query that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    id: String,
    embedding: Vec<f32>,
    query_text: String,
    /// Serialized answer (JSON)
    payload: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry that expires `ttl` after `now`
    pub fn new(
        embedding: Vec<f32>,
        query_text: impl Into<String>,
        payload: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            id: Uuid::new_v4().to_string(),
            embedding,
            query_text: query_text.into(),
            payload: payload.into(),
            created_at: now,
            expires_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// An entry is absent from the instant its expiry is reached
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero once expired
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Deserialize the cached payload
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        serde_json::from_str(&self.payload).map_err(|e| {
            DomainError::cache(format!("Malformed payload in cache entry {}: {}", self.id, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expiry_boundary() {
        let now = Utc::now();
        let entry = CacheEntry::new(vec![1.0], "q", "\"a\"", now, Duration::from_secs(10));

        assert!(!entry.is_expired_at(now));
        assert!(!entry.is_expired_at(now + chrono::Duration::seconds(9)));
        assert!(entry.is_expired_at(now + chrono::Duration::seconds(10)));
        assert_eq!(entry.remaining_ttl(now), Duration::from_secs(10));
        assert_eq!(
            entry.remaining_ttl(now + chrono::Duration::seconds(30)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_entries_get_unique_ids() {
        let now = Utc::now();
        let a = CacheEntry::new(vec![1.0], "q", "1", now, Duration::from_secs(1));
        let b = CacheEntry::new(vec![1.0], "q", "1", now, Duration::from_secs(1));

        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_decode_payload() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Answer {
            text: String,
        }

        let entry = CacheEntry::new(
            vec![0.1],
            "query",
            r#"{"text": "hello"}"#,
            Utc::now(),
            Duration::from_secs(60),
        );

        let answer: Answer = entry.decode_payload().unwrap();
        assert_eq!(answer.text, "hello");
    }

    #[test]
    fn test_decode_malformed_payload() {
        let entry = CacheEntry::new(vec![0.1], "q", "{not json", Utc::now(), Duration::from_secs(60));

        let result: Result<serde_json::Value, _> = entry.decode_payload();
        assert!(matches!(result, Err(DomainError::Cache { .. })));
    }
}
