/// Cache backend contract
///
/// Backends move opaque serialized strings; typed (de)serialization happens
/// in the [`Cache`](crate::cache::Cache) facade. Both backends honor the
/// same TTL policy and expose a server-side glob scan over keys — point
/// operations alone cannot enumerate a key family efficiently.
use crate::error::WaypointResult;
use async_trait::async_trait;
use std::time::Duration;

/// TTL policy applied by a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Leave the entry without an expiry
    None,
    /// Preserve the remaining expiry if the entry already has one
    Keep,
    /// Set a fresh expiry
    Set(Duration),
}

/// Storage backend for the cache
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Write a value under a full key, applying the TTL policy. Returns
    /// whether the write took effect.
    async fn set(&self, key: &str, value: String, ttl: Ttl) -> WaypointResult<bool>;

    /// Point lookup; a miss is `Ok(None)`
    async fn get(&self, key: &str) -> WaypointResult<Option<String>>;

    /// Remove a key, reporting whether it existed
    async fn delete(&self, key: &str) -> WaypointResult<bool>;

    /// Key existence check
    async fn exists(&self, key: &str) -> WaypointResult<bool>;

    /// Point lookups for many keys, one slot per requested key
    async fn multi_get(&self, keys: &[String]) -> WaypointResult<Vec<Option<String>>>;

    /// Server-side glob scan: all values whose keys match the pattern
    /// (`*` and `?` wildcards)
    async fn scan(&self, pattern: &str) -> WaypointResult<Vec<String>>;
}
