/// Configuration management for the Waypoint server
use crate::error::{WaypointError, WaypointResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub cache: CacheSettings,
    pub idgen: IdGenConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Cache store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub redis_url: String,

    /// Key prefix prepended to every cache key. Empty by default so keys
    /// keep the plain "<Tag>:<suffix>" layout.
    pub key_prefix: String,

    /// Use the in-process memory backend instead of Redis (dev/test)
    pub in_memory: bool,
}

/// Identifier minting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdGenConfig {
    /// Explicit 48-bit machine tag. When absent the tag is derived from a
    /// hardware network identifier, falling back to a random value.
    pub machine_tag: Option<u64>,

    /// Bounded wait applied when the per-millisecond sequence is exhausted
    pub max_wait_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> WaypointResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("WAYPOINT_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("WAYPOINT_PORT")
            .unwrap_or_else(|_| "8460".to_string())
            .parse()
            .map_err(|_| WaypointError::Validation("Invalid port number".to_string()))?;
        let version = env::var("WAYPOINT_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("WAYPOINT_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("WAYPOINT_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("waypoint.sqlite"));

        let redis_url = env::var("WAYPOINT_REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let key_prefix = env::var("WAYPOINT_CACHE_KEY_PREFIX").unwrap_or_else(|_| String::new());
        let in_memory = env::var("WAYPOINT_CACHE_IN_MEMORY")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let machine_tag = env::var("WAYPOINT_MACHINE_TAG")
            .ok()
            .and_then(|s| s.parse().ok());
        let max_wait_ms = env::var("WAYPOINT_MINT_MAX_WAIT_MS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            cache: CacheSettings {
                redis_url,
                key_prefix,
                in_memory,
            },
            idgen: IdGenConfig {
                machine_tag,
                max_wait_ms,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> WaypointResult<()> {
        if self.service.hostname.is_empty() {
            return Err(WaypointError::Validation(
                "Hostname cannot be empty".to_string(),
            ));
        }

        if let Some(tag) = self.idgen.machine_tag {
            if tag >= (1 << 48) {
                return Err(WaypointError::Validation(
                    "Machine tag must fit in 48 bits".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_tag_bound() {
        let mut config = ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8460,
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                database: "./data/waypoint.sqlite".into(),
            },
            cache: CacheSettings {
                redis_url: "redis://localhost:6379".to_string(),
                key_prefix: String::new(),
                in_memory: true,
            },
            idgen: IdGenConfig {
                machine_tag: Some(1 << 48),
                max_wait_ms: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        };

        assert!(config.validate().is_err());
        config.idgen.machine_tag = Some((1 << 48) - 1);
        assert!(config.validate().is_ok());
    }
}
