/// In-process cache backend
///
/// Mirrors the Redis backend's semantics (TTL policy, glob scan, miss on
/// expiry) over a shared map. Used by the test suite and by deployments
/// that run without a cache server.
use crate::cache::store::{CacheBackend, Ttl};
use crate::error::WaypointResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::RwLock;

struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Map-backed cache store
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries so scans and multi-gets see the same state a
    /// server-side store would.
    async fn evict_expired(&self) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired());
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn set(&self, key: &str, value: String, ttl: Ttl) -> WaypointResult<bool> {
        let mut entries = self.entries.write().await;

        let expires_at = match ttl {
            Ttl::Set(duration) => Some(Instant::now() + duration),
            Ttl::Keep => entries
                .get(key)
                .filter(|entry| !entry.is_expired())
                .and_then(|entry| entry.expires_at),
            Ttl::None => None,
        };

        entries.insert(key.to_string(), MemoryEntry { value, expires_at });
        Ok(true)
    }

    async fn get(&self, key: &str) -> WaypointResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    async fn delete(&self, key: &str) -> WaypointResult<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(key)
            .is_some_and(|entry| !entry.is_expired()))
    }

    async fn exists(&self, key: &str) -> WaypointResult<bool> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).is_some_and(|entry| !entry.is_expired()))
    }

    async fn multi_get(&self, keys: &[String]) -> WaypointResult<Vec<Option<String>>> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .map(|key| {
                entries
                    .get(key)
                    .filter(|entry| !entry.is_expired())
                    .map(|entry| entry.value.clone())
            })
            .collect())
    }

    async fn scan(&self, pattern: &str) -> WaypointResult<Vec<String>> {
        self.evict_expired().await;

        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(_, entry)| entry.value.clone())
            .collect())
    }
}

/// Redis-style glob matching: `*` matches any run of characters, `?`
/// matches exactly one.
fn glob_match(pattern: &str, text: &str) -> bool {
    fn inner(pattern: &[u8], text: &[u8]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                inner(&pattern[1..], text) || (!text.is_empty() && inner(pattern, &text[1..]))
            }
            (Some(b'?'), Some(_)) => inner(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if p == t => inner(&pattern[1..], &text[1..]),
            _ => false,
        }
    }
    inner(pattern.as_bytes(), text.as_bytes())
}
