/// Cache layer for live entity state
///
/// Provides the TTL-aware key/value store the room coordinator keeps live
/// room state in. Entries are addressed by an explicit type tag plus an
/// instance suffix (`"RoomState:<roomId>"`); suffix chains with wildcard
/// segments (`"1:*:3"`) let one pattern address a family of entries via
/// the backend's server-side glob scan.

pub mod memory;
pub mod redis;
pub mod store;

pub use memory::MemoryCache;
pub use redis::RedisCache;
pub use store::{CacheBackend, Ttl};

use crate::config::CacheSettings;
use crate::error::{WaypointError, WaypointResult};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cache type tags
///
/// Tags are stable string constants supplied by callers; they are part of
/// the persisted key layout and must not change across refactors.
pub mod tags {
    pub const ROOM_STATE: &str = "RoomState";
}

/// Typed cache facade over a backend
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    key_prefix: String,
}

impl Cache {
    /// Build the cache from configuration, choosing the backend
    pub async fn from_settings(settings: &CacheSettings) -> WaypointResult<Self> {
        let backend: Arc<dyn CacheBackend> = if settings.in_memory {
            Arc::new(MemoryCache::new())
        } else {
            Arc::new(RedisCache::connect(&settings.redis_url).await?)
        };

        Ok(Self::new(backend, settings.key_prefix.clone()))
    }

    /// Wrap an explicit backend
    pub fn new(backend: Arc<dyn CacheBackend>, key_prefix: String) -> Self {
        Self {
            backend,
            key_prefix,
        }
    }

    /// Build a full cache key from tag and suffix
    pub fn key(&self, tag: &str, suffix: &str) -> String {
        format!("{}{}:{}", self.key_prefix, tag, suffix)
    }

    /// Store a value. A TTL is applied only when one is given.
    pub async fn insert<T: Serialize>(
        &self,
        tag: &str,
        suffix: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> WaypointResult<()> {
        let key = self.key(tag, suffix);
        let json = serde_json::to_string(value)?;

        let policy = match ttl {
            Some(duration) if !duration.is_zero() => Ttl::Set(duration),
            _ => Ttl::None,
        };

        if !self.backend.set(&key, json, policy).await? {
            return Err(WaypointError::OperationFailed(format!(
                "Cache insert did not take effect for {}",
                key
            )));
        }
        Ok(())
    }

    /// Point lookup. A miss is `Ok(None)`; a corrupt entry is removed and
    /// reported as a miss.
    pub async fn get<T: DeserializeOwned>(
        &self,
        tag: &str,
        suffix: &str,
    ) -> WaypointResult<Option<T>> {
        let key = self.key(tag, suffix);

        match self.backend.get(&key).await? {
            Some(json) => {
                debug!("Cache HIT: {}", key);
                match serde_json::from_str(&json) {
                    Ok(value) => Ok(Some(value)),
                    Err(e) => {
                        warn!("Failed to deserialize cached value at {}: {}", key, e);
                        let _ = self.backend.delete(&key).await;
                        Ok(None)
                    }
                }
            }
            None => {
                debug!("Cache MISS: {}", key);
                Ok(None)
            }
        }
    }

    /// Overwrite-or-create with an explicit TTL policy. Returns whether the
    /// write took effect.
    pub async fn upsert<T: Serialize>(
        &self,
        tag: &str,
        suffix: &str,
        value: &T,
        ttl: Ttl,
    ) -> WaypointResult<bool> {
        let key = self.key(tag, suffix);
        let json = serde_json::to_string(value)?;
        self.backend.set(&key, json, ttl).await
    }

    /// Remove an entry, reporting whether it existed
    pub async fn delete(&self, tag: &str, suffix: &str) -> WaypointResult<bool> {
        let key = self.key(tag, suffix);
        self.backend.delete(&key).await
    }

    /// Key existence check
    pub async fn has_key(&self, tag: &str, suffix: &str) -> WaypointResult<bool> {
        let key = self.key(tag, suffix);
        self.backend.exists(&key).await
    }

    /// Point lookups for many full keys (as built by [`Cache::key`]), one
    /// slot per requested key. Undecodable entries surface as misses.
    pub async fn multi_get<T: DeserializeOwned>(
        &self,
        keys: &[String],
    ) -> WaypointResult<Vec<Option<T>>> {
        let raw = self.backend.multi_get(keys).await?;
        Ok(raw
            .into_iter()
            .map(|slot| slot.and_then(|json| serde_json::from_str(&json).ok()))
            .collect())
    }

    /// Glob scan over a tag's key family; `suffix_pattern` may contain `*`
    /// and `?` segments.
    pub async fn scan<T: DeserializeOwned>(
        &self,
        tag: &str,
        suffix_pattern: &str,
    ) -> WaypointResult<Vec<T>> {
        let pattern = self.key(tag, suffix_pattern);
        let raw = self.backend.scan(&pattern).await?;
        Ok(raw
            .into_iter()
            .filter_map(|json| serde_json::from_str(&json).ok())
            .collect())
    }
}
