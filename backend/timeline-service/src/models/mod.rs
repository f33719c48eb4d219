//! Data structures shared across the timeline query path.
//!
//! Everything here is read-only within a single request: posts are hydrated
//! from the durable store, relationship sets are a per-request snapshot, and
//! `TimelineOptions` is built by the caller and never reused.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post identifier. Opaque string whose lexicographic order equals
/// creation-time order (newer ids compare greater), which makes it usable
/// both as a record key and as a pagination cursor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PostId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// User identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Referenced post (reply target or repost target), carrying just enough
/// context to evaluate relationship filters without another lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedPost {
    pub id: PostId,
    pub author_id: UserId,
    /// Origin host of the referenced post's author; `None` for local users.
    pub author_host: Option<String>,
}

/// Fully hydrated post, joined with author / reply / repost context.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    /// Origin host of the author; `None` for local users.
    pub author_host: Option<String>,
    /// Verified-author marker, set on the joined author row.
    pub author_verified: bool,
    pub text: Option<String>,
    pub media_ids: Vec<String>,
    pub channel_id: Option<String>,
    pub reply_to: Option<RelatedPost>,
    pub repost_of: Option<RelatedPost>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// A pure repost carries a repost target and no content of its own.
    pub fn is_pure_repost(&self) -> bool {
        self.repost_of.is_some() && self.text.is_none() && self.media_ids.is_empty()
    }

    /// A post counts as a filterable reply when it targets a post by someone
    /// other than its own author and other than the viewer. Replies to self
    /// and replies to the viewer stay visible.
    pub fn is_foreign_reply(&self, viewer: Option<&UserId>) -> bool {
        match &self.reply_to {
            Some(reply) => {
                reply.author_id != self.author_id && viewer != Some(&reply.author_id)
            }
            None => false,
        }
    }

    /// True when the post involves any user in `users`: its author (unless
    /// `ignore_author`), the author it replies to, or the author it reposts.
    /// Referenced authors equal to the post author are not re-checked.
    pub fn involves_any(&self, users: &HashSet<UserId>, ignore_author: bool) -> bool {
        if !ignore_author && users.contains(&self.author_id) {
            return true;
        }
        if let Some(reply) = &self.reply_to {
            if reply.author_id != self.author_id && users.contains(&reply.author_id) {
                return true;
            }
        }
        if let Some(repost) = &self.repost_of {
            if repost.author_id != self.author_id && users.contains(&repost.author_id) {
                return true;
            }
        }
        false
    }

    /// True when the author host, the reply author host, or the repost
    /// author host is in the muted-host set. Local posts (no host) never
    /// match.
    pub fn from_muted_host(&self, hosts: &HashSet<String>) -> bool {
        let muted = |host: &Option<String>| host.as_deref().is_some_and(|h| hosts.contains(h));

        muted(&self.author_host)
            || self.reply_to.as_ref().is_some_and(|r| muted(&r.author_host))
            || self.repost_of.as_ref().is_some_and(|r| muted(&r.author_host))
    }
}

/// Per-request snapshot of the viewer's relationship sets. Fetched once with
/// four concurrent lookups and closed over by the filter; no per-post I/O.
#[derive(Debug, Clone, Default)]
pub struct ViewerRelationships {
    /// Users the viewer has muted.
    pub muted_users: HashSet<UserId>,
    /// Users whose reposts the viewer has muted.
    pub muted_repost_authors: HashSet<UserId>,
    /// Users who are blocking the viewer.
    pub blocking_users: HashSet<UserId>,
    /// Origin hosts the viewer has muted.
    pub muted_hosts: HashSet<String>,
}

/// Externally supplied post predicate, ANDed in after every built-in filter.
pub type PostPredicate = Box<dyn Fn(&Post) -> bool + Send + Sync>;

/// Immutable per-call configuration for a timeline read.
///
/// `until_id` and `since_id` are exclusive bounds; when both are present
/// they must satisfy `since_id < until_id` (descending order).
pub struct TimelineOptions {
    /// Names of the precomputed feeds to merge.
    pub feeds: Vec<String>,
    pub until_id: Option<PostId>,
    pub since_id: Option<PostId>,
    pub limit: usize,
    /// Return as soon as at least one post is accepted instead of draining
    /// the merged ids up to `limit`.
    pub allow_partial: bool,
    /// Anonymous requests skip relationship filtering entirely.
    pub viewer: Option<UserId>,
    pub use_db_fallback: bool,
    pub post_filter: Option<PostPredicate>,
    /// Accept the viewer's own posts unconditionally, bypassing every other
    /// filter.
    pub always_include_own: bool,
    /// Exempt the post author from mute/block membership checks; reply and
    /// repost authors are still checked.
    pub ignore_author_mutes: bool,
    /// Reject posts with no attachments.
    pub require_media: bool,
    /// Reject replies to authors other than the post author or the viewer.
    pub exclude_replies: bool,
    /// Reject reposts that carry no content of their own.
    pub exclude_pure_reposts: bool,
    /// Only accept posts from verified authors.
    pub verified_only: bool,
}

impl TimelineOptions {
    /// Options for reading `feeds` with the given `limit`; every toggle off,
    /// database fallback enabled.
    pub fn for_feeds(feeds: Vec<String>, limit: usize) -> Self {
        Self {
            feeds,
            until_id: None,
            since_id: None,
            limit,
            allow_partial: false,
            viewer: None,
            use_db_fallback: true,
            post_filter: None,
            always_include_own: false,
            ignore_author_mutes: false,
            require_media: false,
            exclude_replies: false,
            exclude_pure_reposts: false,
            verified_only: false,
        }
    }
}

/// Client-facing representation of a timeline post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePost {
    pub id: PostId,
    pub author_id: UserId,
    pub text: Option<String>,
    #[serde(default)]
    pub media_ids: Vec<String>,
    pub channel_id: Option<String>,
    pub reply_to_id: Option<PostId>,
    pub repost_of_id: Option<PostId>,
    pub created_at: DateTime<Utc>,
}
