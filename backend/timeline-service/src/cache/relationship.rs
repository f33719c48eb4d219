//! Cached viewer relationship sets.
//!
//! Mute, repost-mute, block and host-mute sets change rarely but are read on
//! every authenticated timeline request, so they are cached in Redis as JSON
//! arrays under `rel:{kind}:{user}` with a short TTL and loaded from
//! Postgres on miss. Values are per-request read-only snapshots; nothing is
//! written back here besides the cache fill.

use std::collections::HashSet;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::error::Result;
use crate::metrics::RELATIONSHIP_CACHE_EVENTS;
use crate::models::UserId;
use crate::services::timeline::RelationshipStore;

pub struct CachedRelationshipStore {
    redis: ConnectionManager,
    pool: PgPool,
    ttl_secs: u64,
}

impl CachedRelationshipStore {
    pub fn new(redis: ConnectionManager, pool: PgPool, ttl_secs: u64) -> Self {
        Self {
            redis,
            pool,
            ttl_secs,
        }
    }

    fn cache_key(kind: &str, viewer: &UserId) -> String {
        format!("rel:{}:{}", kind, viewer)
    }

    /// Cache read. A value that no longer deserializes is treated as a miss:
    /// the key is dropped and the caller falls through to Postgres.
    async fn read_cached(&self, key: &str) -> Result<Option<Vec<String>>> {
        let mut conn = self.redis.clone();
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(json) => match serde_json::from_str::<Vec<String>>(&json) {
                Ok(values) => {
                    RELATIONSHIP_CACHE_EVENTS.with_label_values(&["hit"]).inc();
                    debug!("relationship cache hit for {}", key);
                    Ok(Some(values))
                }
                Err(e) => {
                    warn!("stale relationship cache entry at {}: {}", key, e);
                    RELATIONSHIP_CACHE_EVENTS
                        .with_label_values(&["stale"])
                        .inc();
                    conn.del::<_, ()>(key).await?;
                    Ok(None)
                }
            },
            None => {
                RELATIONSHIP_CACHE_EVENTS.with_label_values(&["miss"]).inc();
                Ok(None)
            }
        }
    }

    async fn write_cached(&self, key: &str, values: &[String]) -> Result<()> {
        let json = serde_json::to_string(values)?;
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(key, json, self.ttl_secs).await?;
        Ok(())
    }

    async fn user_set(&self, kind: &str, viewer: &UserId, query: &str) -> Result<HashSet<UserId>> {
        let key = Self::cache_key(kind, viewer);
        if let Some(cached) = self.read_cached(&key).await? {
            return Ok(cached.into_iter().map(UserId::from).collect());
        }

        let rows: Vec<(String,)> = sqlx::query_as(query)
            .bind(viewer.as_str())
            .fetch_all(&self.pool)
            .await?;
        let values: Vec<String> = rows.into_iter().map(|(id,)| id).collect();

        self.write_cached(&key, &values).await?;
        Ok(values.into_iter().map(UserId::from).collect())
    }
}

#[async_trait::async_trait]
impl RelationshipStore for CachedRelationshipStore {
    async fn muted_users(&self, viewer: &UserId) -> Result<HashSet<UserId>> {
        self.user_set(
            "muted",
            viewer,
            "SELECT mutee_id FROM mutes WHERE muter_id = $1",
        )
        .await
    }

    async fn muted_repost_authors(&self, viewer: &UserId) -> Result<HashSet<UserId>> {
        self.user_set(
            "repost_muted",
            viewer,
            "SELECT mutee_id FROM repost_mutes WHERE muter_id = $1",
        )
        .await
    }

    async fn blocking_users(&self, viewer: &UserId) -> Result<HashSet<UserId>> {
        self.user_set(
            "blocked_by",
            viewer,
            "SELECT blocker_id FROM blocks WHERE blockee_id = $1",
        )
        .await
    }

    async fn muted_hosts(&self, viewer: &UserId) -> Result<HashSet<String>> {
        let key = Self::cache_key("muted_hosts", viewer);
        if let Some(cached) = self.read_cached(&key).await? {
            return Ok(cached.into_iter().collect());
        }

        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT host FROM host_mutes WHERE user_id = $1")
                .bind(viewer.as_str())
                .fetch_all(&self.pool)
                .await?;
        let values: Vec<String> = rows.into_iter().map(|(host,)| host).collect();

        self.write_cached(&key, &values).await?;
        Ok(values.into_iter().collect())
    }
}
