//! Similarity cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the similarity cache
///
/// TTL is set per deployment, not per entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityCacheConfig {
    /// Time-to-live for cached entries in milliseconds
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Maximum difference between price bounds still treated as similar
    #[serde(default = "default_similarity_delta")]
    pub similarity_delta: f64,

    /// Maximum number of entries to store
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_ttl_ms() -> u64 {
    300_000
}

fn default_similarity_delta() -> f64 {
    10.0
}

fn default_max_entries() -> usize {
    10000
}

impl Default for SimilarityCacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            similarity_delta: default_similarity_delta(),
            max_entries: default_max_entries(),
        }
    }
}

impl SimilarityCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get TTL as Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the similarity delta; negative values are treated as 0
    pub fn with_similarity_delta(mut self, delta: f64) -> Self {
        self.similarity_delta = delta.max(0.0);
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }
}
