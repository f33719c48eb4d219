pub mod fanout_index;
pub mod relationship;

pub use fanout_index::RedisFanoutIndex;
pub use relationship::CachedRelationshipStore;
