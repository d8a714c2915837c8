//! Similarity cache domain models and traits
//!
//! Caches scored results per pattern key and only serves them to queries
//! whose pattern is similar to the stored one and within TTL.

mod config;
mod repository;

pub use config::SimilarityCacheConfig;
pub use repository::{is_similar, CacheEntry, CacheLookup, SimilarityCache, SimilarityCacheStats};

#[cfg(test)]
pub use repository::MockSimilarityCache;
