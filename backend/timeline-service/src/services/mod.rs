//! Service layer for timeline-service
//!
//! - post_filter: filter chain evaluated against hydrated posts
//! - timeline: fanout merge, adaptive hydration loop and database backfill

pub mod post_filter;
pub mod timeline;

pub use post_filter::PostFilter;
pub use timeline::{ClientPostPresenter, TimelineService};
