//! Read adapter over the Redis fanout lists.
//!
//! The fanout writer (out of scope here) maintains one Redis list per feed
//! under `{prefix}:{feed}`, newest identifier first, trimmed to a bounded
//! length. Reads fetch the whole list and window it in process: Redis lists
//! have no server-side range-by-value, and the push-side trim keeps the
//! payload small.

use futures::future;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::PostId;
use crate::services::timeline::FanoutIndex;

pub struct RedisFanoutIndex {
    redis: ConnectionManager,
    key_prefix: String,
}

impl RedisFanoutIndex {
    pub fn new(redis: ConnectionManager, key_prefix: String) -> Self {
        Self { redis, key_prefix }
    }

    fn feed_key(&self, feed: &str) -> String {
        format!("{}:{}", self.key_prefix, feed)
    }
}

#[async_trait::async_trait]
impl FanoutIndex for RedisFanoutIndex {
    async fn range_multi(
        &self,
        feeds: &[String],
        until_id: Option<&PostId>,
        since_id: Option<&PostId>,
    ) -> Result<Vec<Vec<PostId>>> {
        let reads = feeds.iter().map(|feed| {
            let key = self.feed_key(feed);
            let mut conn = self.redis.clone();
            async move {
                let ids: Vec<String> = conn.lrange(&key, 0, -1).await?;
                Ok::<_, AppError>(ids)
            }
        });

        let lists = future::try_join_all(reads).await?;

        debug!(
            feeds = feeds.len(),
            ids = lists.iter().map(Vec::len).sum::<usize>(),
            "fanout lists read"
        );

        Ok(lists
            .into_iter()
            .map(|ids| window_descending(ids, until_id, since_id))
            .collect())
    }
}

/// Keep the identifiers strictly inside the exclusive `(since_id, until_id)`
/// window, preserving the list's descending order.
fn window_descending(
    ids: Vec<String>,
    until_id: Option<&PostId>,
    since_id: Option<&PostId>,
) -> Vec<PostId> {
    ids.into_iter()
        .map(PostId::from)
        .filter(|id| until_id.map_or(true, |until| id < until))
        .filter(|id| since_id.map_or(true, |since| id > since))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn posts(raw: &[&str]) -> Vec<PostId> {
        raw.iter().map(|s| PostId::from(*s)).collect()
    }

    #[test]
    fn no_cursors_keeps_everything() {
        let out = window_descending(ids(&["p5", "p4", "p3"]), None, None);
        assert_eq!(out, posts(&["p5", "p4", "p3"]));
    }

    #[test]
    fn bounds_are_exclusive_on_both_ends() {
        let until = PostId::from("p5");
        let since = PostId::from("p2");
        let out = window_descending(
            ids(&["p6", "p5", "p4", "p3", "p2", "p1"]),
            Some(&until),
            Some(&since),
        );
        assert_eq!(out, posts(&["p4", "p3"]));
    }

    #[test]
    fn until_only_drops_newer_ids() {
        let until = PostId::from("p4");
        let out = window_descending(ids(&["p5", "p4", "p3", "p1"]), Some(&until), None);
        assert_eq!(out, posts(&["p3", "p1"]));
    }

    #[test]
    fn since_only_drops_older_ids() {
        let since = PostId::from("p3");
        let out = window_descending(ids(&["p5", "p4", "p3", "p1"]), None, Some(&since));
        assert_eq!(out, posts(&["p5", "p4"]));
    }
}
