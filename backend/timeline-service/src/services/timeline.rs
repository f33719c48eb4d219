//! Timeline read path: merge precomputed feeds, filter after hydration,
//! backfill from Postgres when the feeds cannot satisfy the request.
//!
//! The index stores identifiers only, so filtering runs after hydration and
//! batch sizes shrink unpredictably; the fetch loop compensates with an
//! adaptive over-fetch multiplier capped at 3x to bound hydration queries.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use sqlx::postgres::PgPoolOptions;
use tracing::debug;

use crate::cache::{CachedRelationshipStore, RedisFanoutIndex};
use crate::config::Config;
use crate::db::PgPostStore;
use crate::error::{AppError, Result};
use crate::metrics::{
    TIMELINE_BATCH_SURVIVAL_RATE, TIMELINE_DB_FALLBACK_TOTAL, TIMELINE_REQUEST_TOTAL,
};
use crate::models::{
    Post, PostId, TimelineOptions, TimelinePost, UserId, ViewerRelationships,
};
use crate::services::post_filter::PostFilter;

/// Precomputed per-feed identifier index. Each returned list is
/// independently descending and bounded by the exclusive cursor pair.
#[async_trait]
pub trait FanoutIndex: Send + Sync {
    async fn range_multi(
        &self,
        feeds: &[String],
        until_id: Option<&PostId>,
        since_id: Option<&PostId>,
    ) -> Result<Vec<Vec<PostId>>>;
}

/// Viewer relationship sets, fetched once per request.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    async fn muted_users(&self, viewer: &UserId) -> Result<HashSet<UserId>>;
    async fn muted_repost_authors(&self, viewer: &UserId) -> Result<HashSet<UserId>>;
    async fn blocking_users(&self, viewer: &UserId) -> Result<HashSet<UserId>>;
    async fn muted_hosts(&self, viewer: &UserId) -> Result<HashSet<String>>;
}

/// Durable post store: hydration by identifier set plus a native descending
/// cursor query used as the fallback path.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Order of the returned posts is not guaranteed; identifiers that no
    /// longer resolve are simply absent.
    async fn hydrate(&self, ids: &[PostId]) -> Result<Vec<Post>>;

    /// Natively descending cursor query over the same ordering, with the
    /// store's own visibility rules applied.
    async fn query_fallback(
        &self,
        until_id: Option<&PostId>,
        since_id: Option<&PostId>,
        limit: usize,
    ) -> Result<Vec<Post>>;
}

/// Conversion of hydrated posts into their client representation.
#[async_trait]
pub trait PostPresenter: Send + Sync {
    async fn present_many(
        &self,
        posts: Vec<Post>,
        viewer: Option<&UserId>,
    ) -> Result<Vec<TimelinePost>>;
}

/// Default presenter. Full client packing lives with the API layer; this
/// keeps the field-by-field conversion in one place.
pub struct ClientPostPresenter;

#[async_trait]
impl PostPresenter for ClientPostPresenter {
    async fn present_many(
        &self,
        posts: Vec<Post>,
        _viewer: Option<&UserId>,
    ) -> Result<Vec<TimelinePost>> {
        Ok(posts
            .into_iter()
            .map(|p| TimelinePost {
                id: p.id,
                author_id: p.author_id,
                text: p.text,
                media_ids: p.media_ids,
                channel_id: p.channel_id,
                reply_to_id: p.reply_to.map(|r| r.id),
                repost_of_id: p.repost_of.map(|r| r.id),
                created_at: p.created_at,
            })
            .collect())
    }
}

/// Timeline query service over the fanout index, the relationship store and
/// the durable post store.
pub struct TimelineService {
    index: Arc<dyn FanoutIndex>,
    relationships: Arc<dyn RelationshipStore>,
    store: Arc<dyn PostStore>,
    presenter: Arc<dyn PostPresenter>,
}

impl TimelineService {
    pub fn new(
        index: Arc<dyn FanoutIndex>,
        relationships: Arc<dyn RelationshipStore>,
        store: Arc<dyn PostStore>,
        presenter: Arc<dyn PostPresenter>,
    ) -> Self {
        Self {
            index,
            relationships,
            store,
            presenter,
        }
    }

    /// Build the service with its default Redis/Postgres adapters.
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = redis::Client::open(config.redis.url.as_str())?;
        let redis = ConnectionManager::new(client).await?;

        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await?;

        Ok(Self::new(
            Arc::new(RedisFanoutIndex::new(
                redis.clone(),
                config.timeline.feed_key_prefix.clone(),
            )),
            Arc::new(CachedRelationshipStore::new(
                redis,
                pool.clone(),
                config.timeline.relationship_ttl_secs,
            )),
            Arc::new(PgPostStore::new(pool)),
            Arc::new(ClientPostPresenter),
        ))
    }

    /// Read a timeline window and convert it to client posts, preserving
    /// order.
    pub async fn timeline(&self, opts: TimelineOptions) -> Result<Vec<TimelinePost>> {
        let viewer = opts.viewer.clone();
        let posts = self.fetch_posts(opts).await?;
        self.presenter.present_many(posts, viewer.as_ref()).await
    }

    /// Core merge/filter/backfill loop. Returns posts strictly descending by
    /// id, at most `opts.limit` of them.
    pub async fn fetch_posts(&self, mut opts: TimelineOptions) -> Result<Vec<Post>> {
        if let (Some(until), Some(since)) = (&opts.until_id, &opts.since_id) {
            if since >= until {
                return Err(AppError::InvalidCursor(format!(
                    "since_id {} must precede until_id {}",
                    since, until
                )));
            }
        }
        if opts.limit == 0 {
            return Ok(Vec::new());
        }

        let per_feed = self
            .index
            .range_multi(&opts.feeds, opts.until_id.as_ref(), opts.since_id.as_ref())
            .await?;

        // Duplicate feed names and overlapping feeds both collapse here:
        // dedup after flattening, before the global sort.
        let mut seen = HashSet::new();
        let mut merged: Vec<PostId> = Vec::new();
        for id in per_feed.into_iter().flatten() {
            if seen.insert(id.clone()) {
                merged.push(id);
            }
        }
        merged.sort_unstable_by(|a, b| b.cmp(a));

        debug!(
            feeds = opts.feeds.len(),
            merged = merged.len(),
            limit = opts.limit,
            "fanout feeds merged"
        );

        if merged.is_empty() {
            if !opts.use_db_fallback {
                TIMELINE_REQUEST_TOTAL.with_label_values(&["fanout"]).inc();
                return Ok(Vec::new());
            }
            TIMELINE_DB_FALLBACK_TOTAL
                .with_label_values(&["empty_index"])
                .inc();
            TIMELINE_REQUEST_TOTAL
                .with_label_values(&["fallback"])
                .inc();
            return self
                .store
                .query_fallback(opts.until_id.as_ref(), opts.since_id.as_ref(), opts.limit)
                .await;
        }

        let relationships = match &opts.viewer {
            Some(viewer) => Some(self.load_relationships(viewer).await?),
            None => None,
        };
        let custom = opts.post_filter.take();
        let filter = PostFilter::for_request(&opts, custom, relationships);

        let mut accepted: Vec<Post> = Vec::new();
        let mut read_from_index = 0usize;
        let mut last_rate = 1.0f64;

        while read_from_index < merged.len() {
            let remaining = opts.limit - accepted.len();
            // Assume batches keep roughly the survival rate observed so far;
            // the 3x cap bounds the worst-case hydration query.
            let multiplier = (1.1f64 / last_rate).min(3.0).ceil() as usize;
            let count_to_get = remaining * multiplier;

            let end = (read_from_index + count_to_get).min(merged.len());
            let batch = &merged[read_from_index..end];
            read_from_index = end;

            let mut survivors: Vec<Post> = self
                .store
                .hydrate(batch)
                .await?
                .into_iter()
                .filter(|p| filter.accepts(p))
                .collect();
            // Hydration order is unspecified.
            survivors.sort_unstable_by(|a, b| b.id.cmp(&a.id));

            last_rate = if batch.is_empty() {
                0.0
            } else {
                survivors.len() as f64 / batch.len() as f64
            };
            TIMELINE_BATCH_SURVIVAL_RATE.observe(last_rate);

            debug!(
                batch = batch.len(),
                survivors = survivors.len(),
                accepted = accepted.len() + survivors.len(),
                "fanout batch hydrated"
            );

            accepted.extend(survivors);

            let satisfied = if opts.allow_partial {
                !accepted.is_empty()
            } else {
                accepted.len() >= opts.limit
            };
            if satisfied {
                TIMELINE_REQUEST_TOTAL.with_label_values(&["fanout"]).inc();
                accepted.truncate(opts.limit);
                return Ok(accepted);
            }
        }

        // Merged ids exhausted short of the target: backfill the remainder
        // starting below the last consumed identifier.
        if opts.use_db_fallback {
            let remaining = opts.limit - accepted.len();
            TIMELINE_DB_FALLBACK_TOTAL
                .with_label_values(&["shortfall"])
                .inc();
            let source = if accepted.is_empty() { "fallback" } else { "mixed" };
            TIMELINE_REQUEST_TOTAL.with_label_values(&[source]).inc();

            let backfill = self
                .store
                .query_fallback(merged.last(), opts.since_id.as_ref(), remaining)
                .await?;
            accepted.extend(backfill);
        } else {
            TIMELINE_REQUEST_TOTAL.with_label_values(&["fanout"]).inc();
        }

        Ok(accepted)
    }

    async fn load_relationships(&self, viewer: &UserId) -> Result<ViewerRelationships> {
        let (muted_users, muted_repost_authors, blocking_users, muted_hosts) = tokio::try_join!(
            self.relationships.muted_users(viewer),
            self.relationships.muted_repost_authors(viewer),
            self.relationships.blocking_users(viewer),
            self.relationships.muted_hosts(viewer),
        )?;

        Ok(ViewerRelationships {
            muted_users,
            muted_repost_authors,
            blocking_users,
            muted_hosts,
        })
    }
}
