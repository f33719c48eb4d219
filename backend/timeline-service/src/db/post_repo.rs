//! Durable post store backed by Postgres.
//!
//! Hydration joins the author row and the reply/repost target rows (with
//! their authors) in one query so the filter chain never issues follow-up
//! lookups. The fallback query pages the same descending id order natively
//! and applies the store's own visibility rule.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::error::Result;
use crate::models::{Post, PostId, RelatedPost, UserId};
use crate::services::timeline::PostStore;

const POST_SELECT: &str = r#"
SELECT p.id, p.author_id, au.host AS author_host, au.verified AS author_verified,
       p.text, p.media_ids, p.channel_id, p.created_at,
       rp.id AS reply_id, rp.author_id AS reply_author_id, ru.host AS reply_author_host,
       qp.id AS repost_id, qp.author_id AS repost_author_id, qu.host AS repost_author_host
FROM posts p
JOIN users au ON au.id = p.author_id
LEFT JOIN posts rp ON rp.id = p.reply_to_id
LEFT JOIN users ru ON ru.id = rp.author_id
LEFT JOIN posts qp ON qp.id = p.repost_of_id
LEFT JOIN users qu ON qu.id = qp.author_id
"#;

pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PostStore for PgPostStore {
    async fn hydrate(&self, ids: &[PostId]) -> Result<Vec<Post>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_values: Vec<String> = ids.iter().map(|id| id.0.clone()).collect();
        let query = format!("{POST_SELECT} WHERE p.id = ANY($1) AND p.deleted_at IS NULL");

        let rows = sqlx::query(&query)
            .bind(&id_values)
            .fetch_all(&self.pool)
            .await?;

        debug!(requested = ids.len(), hydrated = rows.len(), "posts hydrated");

        rows.iter().map(post_from_row).collect()
    }

    async fn query_fallback(
        &self,
        until_id: Option<&PostId>,
        since_id: Option<&PostId>,
        limit: usize,
    ) -> Result<Vec<Post>> {
        let query = format!(
            r#"{POST_SELECT}
WHERE p.deleted_at IS NULL
  AND p.visibility = 'public'
  AND ($1::text IS NULL OR p.id < $1)
  AND ($2::text IS NULL OR p.id > $2)
ORDER BY p.id DESC
LIMIT $3"#
        );

        let rows = sqlx::query(&query)
            .bind(until_id.map(|id| id.0.clone()))
            .bind(since_id.map(|id| id.0.clone()))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        debug!(limit, returned = rows.len(), "fallback query executed");

        rows.iter().map(post_from_row).collect()
    }
}

fn post_from_row(row: &PgRow) -> Result<Post> {
    let reply_to = match row.try_get::<Option<String>, _>("reply_id")? {
        Some(id) => Some(RelatedPost {
            id: PostId::from(id),
            author_id: UserId::from(row.try_get::<String, _>("reply_author_id")?),
            author_host: row.try_get("reply_author_host")?,
        }),
        None => None,
    };

    let repost_of = match row.try_get::<Option<String>, _>("repost_id")? {
        Some(id) => Some(RelatedPost {
            id: PostId::from(id),
            author_id: UserId::from(row.try_get::<String, _>("repost_author_id")?),
            author_host: row.try_get("repost_author_host")?,
        }),
        None => None,
    };

    Ok(Post {
        id: PostId::from(row.try_get::<String, _>("id")?),
        author_id: UserId::from(row.try_get::<String, _>("author_id")?),
        author_host: row.try_get("author_host")?,
        author_verified: row.try_get("author_verified")?,
        text: row.try_get("text")?,
        media_ids: row.try_get("media_ids")?,
        channel_id: row.try_get("channel_id")?,
        reply_to,
        repost_of,
        created_at: row.try_get("created_at")?,
    })
}
