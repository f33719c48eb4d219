//! Filter chain applied to hydrated posts.
//!
//! The fanout index stores identifiers only, so every content- and
//! relationship-based rule can run only after hydration. A `PostFilter` is
//! built once per request from the request options plus a relationship
//! snapshot, then evaluated per post with no further I/O.

use crate::models::{Post, PostPredicate, TimelineOptions, UserId, ViewerRelationships};

/// One enabled filter rule. All active conditions must hold for a post to be
/// accepted.
pub enum FilterCondition {
    /// Reject posts with no attachments.
    RequireMedia,
    /// Reject replies to authors other than the post author or the viewer.
    ExcludeReplies { viewer: Option<UserId> },
    /// Reject reposts carrying no content of their own.
    ExcludePureReposts,
    /// Reject posts from unverified authors.
    VerifiedOnly,
    /// Reject posts involving blocked/muted users or muted hosts.
    Relationships {
        snapshot: ViewerRelationships,
        ignore_author: bool,
    },
    /// Externally supplied predicate, evaluated last.
    Custom(PostPredicate),
}

impl FilterCondition {
    fn accepts(&self, post: &Post) -> bool {
        match self {
            FilterCondition::RequireMedia => !post.media_ids.is_empty(),
            FilterCondition::ExcludeReplies { viewer } => {
                !post.is_foreign_reply(viewer.as_ref())
            }
            FilterCondition::ExcludePureReposts => !post.is_pure_repost(),
            FilterCondition::VerifiedOnly => post.author_verified,
            FilterCondition::Relationships {
                snapshot,
                ignore_author,
            } => {
                if post.involves_any(&snapshot.blocking_users, *ignore_author) {
                    return false;
                }
                if post.involves_any(&snapshot.muted_users, *ignore_author) {
                    return false;
                }
                if post.is_pure_repost()
                    && post.involves_any(&snapshot.muted_repost_authors, *ignore_author)
                {
                    return false;
                }
                if post.from_muted_host(&snapshot.muted_hosts) {
                    return false;
                }
                true
            }
            FilterCondition::Custom(predicate) => predicate(post),
        }
    }
}

/// Composed predicate over a hydrated post.
///
/// The viewer's own posts short-circuit to acceptance when the request asked
/// for them; everything else folds the enabled conditions with logical AND.
pub struct PostFilter {
    include_author: Option<UserId>,
    conditions: Vec<FilterCondition>,
}

impl PostFilter {
    /// Build the filter for one request. `relationships` is the per-request
    /// snapshot and is `None` for anonymous requests. `custom` is the
    /// caller-supplied predicate taken out of the options.
    pub fn for_request(
        opts: &TimelineOptions,
        custom: Option<PostPredicate>,
        relationships: Option<ViewerRelationships>,
    ) -> Self {
        let mut conditions = Vec::new();

        if opts.require_media {
            conditions.push(FilterCondition::RequireMedia);
        }
        if opts.exclude_replies {
            conditions.push(FilterCondition::ExcludeReplies {
                viewer: opts.viewer.clone(),
            });
        }
        if opts.exclude_pure_reposts {
            conditions.push(FilterCondition::ExcludePureReposts);
        }
        if opts.verified_only {
            conditions.push(FilterCondition::VerifiedOnly);
        }
        if let Some(snapshot) = relationships {
            conditions.push(FilterCondition::Relationships {
                snapshot,
                ignore_author: opts.ignore_author_mutes,
            });
        }
        if let Some(predicate) = custom {
            conditions.push(FilterCondition::Custom(predicate));
        }

        let include_author = if opts.always_include_own {
            opts.viewer.clone()
        } else {
            None
        };

        Self {
            include_author,
            conditions,
        }
    }

    pub fn accepts(&self, post: &Post) -> bool {
        if let Some(me) = &self.include_author {
            if &post.author_id == me {
                return true;
            }
        }
        self.conditions.iter().all(|c| c.accepts(post))
    }
}
