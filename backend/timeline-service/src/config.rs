use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub timeline: TimelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Key prefix of the per-feed lists maintained by the fanout writer.
    #[serde(default = "default_feed_key_prefix")]
    pub feed_key_prefix: String,
    /// TTL of the cached viewer relationship sets.
    #[serde(default = "default_relationship_ttl_secs")]
    pub relationship_ttl_secs: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            feed_key_prefix: default_feed_key_prefix(),
            relationship_ttl_secs: default_relationship_ttl_secs(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .map_err(|_| AppError::Config("DATABASE_URL not set".to_string()))?,
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::Config("DATABASE_MAX_CONNECTIONS must be a number".to_string())
                    })?,
            },
            redis: RedisConfig {
                url: std::env::var("REDIS_URL")
                    .map_err(|_| AppError::Config("REDIS_URL not set".to_string()))?,
            },
            timeline: TimelineConfig {
                feed_key_prefix: std::env::var("TIMELINE_FEED_KEY_PREFIX")
                    .unwrap_or_else(|_| default_feed_key_prefix()),
                relationship_ttl_secs: std::env::var("TIMELINE_RELATIONSHIP_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_relationship_ttl_secs),
            },
        })
    }
}

fn default_feed_key_prefix() -> String {
    "timeline".to_string()
}

fn default_relationship_ttl_secs() -> u64 {
    300
}
