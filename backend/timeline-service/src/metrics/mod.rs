use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Histogram, IntCounterVec,
};

lazy_static! {
    /// Total timeline reads segmented by the data source that satisfied them
    /// (fanout, fallback, mixed).
    pub static ref TIMELINE_REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "timeline_request_total",
        "Timeline reads segmented by satisfying data source",
        &["source"]
    )
    .expect("failed to register timeline_request_total");

    /// Fraction of each hydrated batch that survived filtering.
    pub static ref TIMELINE_BATCH_SURVIVAL_RATE: Histogram = register_histogram!(
        "timeline_batch_survival_rate",
        "Per-batch fraction of hydrated posts surviving the filter chain",
        prometheus::linear_buckets(0.0, 0.1, 11).expect("survival rate buckets")
    )
    .expect("failed to register timeline_batch_survival_rate");

    /// Database fallback invocations segmented by reason (empty_index,
    /// shortfall).
    pub static ref TIMELINE_DB_FALLBACK_TOTAL: IntCounterVec = register_int_counter_vec!(
        "timeline_db_fallback_total",
        "Database fallback invocations segmented by reason",
        &["reason"]
    )
    .expect("failed to register timeline_db_fallback_total");

    /// Relationship cache events (hit/miss/stale).
    pub static ref RELATIONSHIP_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "timeline_relationship_cache_events_total",
        "Relationship cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register timeline_relationship_cache_events_total");
}
