/// Timeline Service Library
///
/// Answers timeline read requests for the Meridian platform by merging the
/// precomputed per-feed identifier lists kept in Redis, filtering hydrated
/// posts against per-request rules and viewer relationships, and backfilling
/// from Postgres when the precomputed feeds cannot satisfy the requested
/// count. The wire layer that invokes it lives with the API gateway.
///
/// # Modules
///
/// - `services`: filter chain and the fanout merge/backfill core
/// - `cache`: Redis adapters (fanout index reads, relationship sets)
/// - `db`: Postgres post store (hydration and fallback queries)
/// - `models`: posts, identifiers and per-request options
/// - `error`: error types and handling
/// - `config`: configuration management
/// - `metrics`: observability and metrics collection
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
pub use models::{Post, PostId, TimelineOptions, TimelinePost, UserId};
pub use services::timeline::{
    ClientPostPresenter, FanoutIndex, PostPresenter, PostStore, RelationshipStore,
    TimelineService,
};
