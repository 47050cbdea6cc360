/// Redis cache backend
///
/// Live entity state is held in Redis through a [`ConnectionManager`],
/// which reconnects transparently. The glob scan maps onto the
/// server-executed `KEYS` + `MGET` pair.
use crate::cache::store::{CacheBackend, Ttl};
use crate::error::{WaypointError, WaypointResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, error, info};

/// Redis-backed cache store
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis
    pub async fn connect(redis_url: &str) -> WaypointResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = Client::open(redis_url).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            WaypointError::Cache(format!("Redis client creation failed: {}", e))
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to connect to Redis: {}", e);
            WaypointError::Cache(format!("Redis connection failed: {}", e))
        })?;

        info!("Redis connection established");

        Ok(Self { connection })
    }

    /// Ping the server to check the connection
    pub async fn ping(&self) -> WaypointResult<()> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| WaypointError::Cache(format!("Redis PING failed: {}", e)))?;

        if pong != "PONG" {
            return Err(WaypointError::Cache(
                "Unexpected Redis PING response".to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn set(&self, key: &str, value: String, ttl: Ttl) -> WaypointResult<bool> {
        let mut conn = self.connection.clone();

        match ttl {
            Ttl::Set(duration) => {
                debug!("Cache SET: {} (TTL: {}ms)", key, duration.as_millis());
                conn.pset_ex::<_, _, ()>(key, value, duration.as_millis() as u64)
                    .await
                    .map_err(|e| WaypointError::Cache(format!("Redis SET failed: {}", e)))?;
            }
            Ttl::Keep => {
                debug!("Cache SET: {} (keep TTL)", key);
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("KEEPTTL")
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(|e| WaypointError::Cache(format!("Redis SET failed: {}", e)))?;
            }
            Ttl::None => {
                debug!("Cache SET: {}", key);
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(|e| WaypointError::Cache(format!("Redis SET failed: {}", e)))?;
            }
        }

        Ok(true)
    }

    async fn get(&self, key: &str) -> WaypointResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get(key)
            .await
            .map_err(|e| WaypointError::Cache(format!("Redis GET failed: {}", e)))
    }

    async fn delete(&self, key: &str) -> WaypointResult<bool> {
        let mut conn = self.connection.clone();
        let removed: i64 = conn
            .del(key)
            .await
            .map_err(|e| WaypointError::Cache(format!("Redis DEL failed: {}", e)))?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> WaypointResult<bool> {
        let mut conn = self.connection.clone();
        conn.exists(key)
            .await
            .map_err(|e| WaypointError::Cache(format!("Redis EXISTS failed: {}", e)))
    }

    async fn multi_get(&self, keys: &[String]) -> WaypointResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection.clone();
        conn.mget(keys)
            .await
            .map_err(|e| WaypointError::Cache(format!("Redis MGET failed: {}", e)))
    }

    async fn scan(&self, pattern: &str) -> WaypointResult<Vec<String>> {
        debug!("Cache SCAN pattern: {}", pattern);

        let mut conn = self.connection.clone();
        let keys: Vec<String> = conn
            .keys(pattern)
            .await
            .map_err(|e| WaypointError::Cache(format!("Redis KEYS failed: {}", e)))?;

        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = conn
            .mget(&keys)
            .await
            .map_err(|e| WaypointError::Cache(format!("Redis MGET failed: {}", e)))?;

        Ok(values.into_iter().flatten().collect())
    }
}
