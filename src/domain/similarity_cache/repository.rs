//! Similarity cache trait and types

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[cfg(test)]
use mockall::automock;

use crate::domain::demand::DemandPattern;
use crate::domain::resonance::ScoredCandidate;
use crate::domain::DomainError;

/// A cached, scored result set
#[derive(Debug, Clone)]
pub struct CacheEntry {
    data: Vec<ScoredCandidate>,
    pattern: DemandPattern,
    stored_at: Instant,
    cached_at: DateTime<Utc>,
    hit_count: u32,
}

impl CacheEntry {
    pub fn new(pattern: DemandPattern, data: Vec<ScoredCandidate>, stored_at: Instant) -> Self {
        Self {
            data,
            pattern,
            stored_at,
            cached_at: Utc::now(),
            hit_count: 0,
        }
    }

    pub fn data(&self) -> &[ScoredCandidate] {
        &self.data
    }

    pub fn into_data(self) -> Vec<ScoredCandidate> {
        self.data
    }

    /// The pattern the data was produced for
    pub fn pattern(&self) -> &DemandPattern {
        &self.pattern
    }

    pub fn stored_at(&self) -> Instant {
        self.stored_at
    }

    /// Wall-clock time of the write
    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    pub fn hit_count(&self) -> u32 {
        self.hit_count
    }

    pub fn increment_hits(&mut self) {
        self.hit_count = self.hit_count.saturating_add(1);
    }

    /// Age of the entry at `now`
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }

    /// Whether the entry has outlived `ttl` at `now`
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) >= ttl
    }
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Fresh, similar entry
    Hit(Vec<ScoredCandidate>),
    /// Similar entry that had expired; it has been removed from the cache
    Stale(Vec<ScoredCandidate>),
    Miss,
}

impl CacheLookup {
    /// Fresh data only
    pub fn into_hit(self) -> Option<Vec<ScoredCandidate>> {
        match self {
            Self::Hit(data) => Some(data),
            _ => None,
        }
    }
}

/// Statistics for the similarity cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimilarityCacheStats {
    pub total_entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Entries removed to stay under capacity
    pub evictions: u64,
}

impl SimilarityCacheStats {
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;

        if total == 0 {
            return 0.0;
        }

        self.hits as f32 / total as f32
    }
}

/// Whether a stored pattern may answer a query pattern
///
/// Categorical fields must match exactly; each price bound must differ by
/// strictly less than `delta`.
pub fn is_similar(stored: &DemandPattern, query: &DemandPattern, delta: f64) -> bool {
    if stored.category() != query.category() || stored.search_term() != query.search_term() {
        return false;
    }

    let stored_range = stored.price_range();
    let query_range = query.price_range();

    (stored_range.min - query_range.min).abs() < delta
        && (stored_range.max - query_range.max).abs() < delta
}

/// Trait for TTL- and similarity-aware result caching
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SimilarityCache: Send + Sync + std::fmt::Debug {
    /// Look up a pattern, distinguishing fresh, expired and missing entries
    async fn lookup(&self, pattern: &DemandPattern) -> Result<CacheLookup, DomainError>;

    /// Fresh, similar data for a pattern, if any
    async fn get(
        &self,
        pattern: &DemandPattern,
    ) -> Result<Option<Vec<ScoredCandidate>>, DomainError> {
        Ok(self.lookup(pattern).await?.into_hit())
    }

    /// Store an entry, replacing any entry similar to the pattern
    async fn set(
        &self,
        pattern: &DemandPattern,
        candidates: Vec<ScoredCandidate>,
    ) -> Result<(), DomainError>;

    /// Whether an entry stored for `stored` may serve `query`
    fn similarity(&self, stored: &DemandPattern, query: &DemandPattern) -> bool;

    /// Remove the entries similar to a pattern
    async fn invalidate(&self, pattern: &DemandPattern) -> Result<bool, DomainError>;

    /// Clear all entries and counters
    async fn clear(&self) -> Result<(), DomainError>;

    /// Remove all expired entries
    async fn cleanup_expired(&self) -> Result<usize, DomainError>;

    async fn size(&self) -> Result<usize, DomainError>;

    async fn stats(&self) -> Result<SimilarityCacheStats, DomainError>;
}
