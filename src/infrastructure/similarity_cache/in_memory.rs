//! In-memory similarity cache implementation

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use metrics::counter;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::demand::{DemandPattern, PatternKey};
use crate::domain::resonance::ScoredCandidate;
use crate::domain::similarity_cache::{
    is_similar, CacheEntry, CacheLookup, SimilarityCache, SimilarityCacheConfig,
    SimilarityCacheStats,
};
use crate::domain::{Clock, DomainError};

/// Process-local similarity cache
///
/// Entries are grouped by pattern key. A group holds one entry per price
/// range, so dissimilar ranges for the same term do not displace each other.
/// Expired entries are removed lazily when their group is read, or in bulk
/// through `cleanup_expired`. Each lookup runs under the write lock so
/// expiry, deletion and hit counting happen as one step.
#[derive(Debug)]
pub struct InMemorySimilarityCache {
    entries: RwLock<HashMap<PatternKey, Vec<CacheEntry>>>,
    config: SimilarityCacheConfig,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
}

impl InMemorySimilarityCache {
    pub fn new(config: SimilarityCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &SimilarityCacheConfig {
        &self.config
    }

    /// Evict the oldest entry across all groups if the cache is full
    fn evict_if_needed(&self, entries: &mut HashMap<PatternKey, Vec<CacheEntry>>) {
        if count_entries(entries) < self.config.max_entries {
            return;
        }

        let oldest = entries
            .iter()
            .flat_map(|(key, group)| {
                group
                    .iter()
                    .enumerate()
                    .map(move |(index, entry)| (key, index, entry.stored_at()))
            })
            .min_by_key(|(_, _, stored_at)| *stored_at)
            .map(|(key, index, _)| (key.clone(), index));

        let Some((key, index)) = oldest else {
            return;
        };

        if let Some(group) = entries.get_mut(&key) {
            group.remove(index);
            if group.is_empty() {
                entries.remove(&key);
            }
        }

        self.evictions.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Evicted oldest cache entry");
    }

    fn record_miss(&self, key: &PatternKey, reason: &'static str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("matcher_cache_misses_total", "reason" => reason).increment(1);
        debug!(key = %key, reason, "Cache miss");
    }
}

fn count_entries(entries: &HashMap<PatternKey, Vec<CacheEntry>>) -> usize {
    entries.values().map(Vec::len).sum()
}

#[async_trait]
impl SimilarityCache for InMemorySimilarityCache {
    async fn lookup(&self, pattern: &DemandPattern) -> Result<CacheLookup, DomainError> {
        let key = PatternKey::from_pattern(pattern);
        let now = self.clock.now();
        let ttl = self.config.ttl();
        let mut entries = self.entries.write().await;

        let Some(group) = entries.get_mut(&key) else {
            self.record_miss(&key, "absent");
            return Ok(CacheLookup::Miss);
        };

        let (expired, fresh): (Vec<CacheEntry>, Vec<CacheEntry>) = std::mem::take(group)
            .into_iter()
            .partition(|entry| entry.is_expired(now, ttl));
        *group = fresh;
        self.expirations.fetch_add(expired.len() as u64, Ordering::Relaxed);

        if let Some(entry) = group
            .iter_mut()
            .filter(|entry| self.similarity(entry.pattern(), pattern))
            .max_by_key(|entry| entry.stored_at())
        {
            entry.increment_hits();
            self.hits.fetch_add(1, Ordering::Relaxed);
            counter!("matcher_cache_hits_total").increment(1);
            debug!(key = %key, hit_count = entry.hit_count(), "Cache hit");

            return Ok(CacheLookup::Hit(entry.data().to_vec()));
        }

        if group.is_empty() {
            entries.remove(&key);
        }

        let stale = expired
            .into_iter()
            .filter(|entry| self.similarity(entry.pattern(), pattern))
            .max_by_key(CacheEntry::stored_at);

        match stale {
            Some(entry) => {
                self.record_miss(&key, "expired");
                Ok(CacheLookup::Stale(entry.into_data()))
            }
            None => {
                self.record_miss(&key, "dissimilar");
                Ok(CacheLookup::Miss)
            }
        }
    }

    async fn set(
        &self,
        pattern: &DemandPattern,
        candidates: Vec<ScoredCandidate>,
    ) -> Result<(), DomainError> {
        if self.config.max_entries == 0 {
            return Ok(());
        }

        let key = PatternKey::from_pattern(pattern);
        let entry = CacheEntry::new(pattern.clone(), candidates, self.clock.now());
        let mut entries = self.entries.write().await;

        let replaces = entries.get(&key).is_some_and(|group| {
            group
                .iter()
                .any(|existing| self.similarity(existing.pattern(), pattern))
        });
        if !replaces {
            self.evict_if_needed(&mut entries);
        }

        debug!(key = %key, candidates = entry.data().len(), replaces, "Cache write");

        let group = entries.entry(key).or_default();
        group.retain(|existing| !self.similarity(existing.pattern(), pattern));
        group.push(entry);

        Ok(())
    }

    fn similarity(&self, stored: &DemandPattern, query: &DemandPattern) -> bool {
        is_similar(stored, query, self.config.similarity_delta)
    }

    async fn invalidate(&self, pattern: &DemandPattern) -> Result<bool, DomainError> {
        let key = PatternKey::from_pattern(pattern);
        let mut entries = self.entries.write().await;

        let Some(group) = entries.get_mut(&key) else {
            return Ok(false);
        };

        let before = group.len();
        group.retain(|entry| !self.similarity(entry.pattern(), pattern));
        let removed = group.len() < before;

        if group.is_empty() {
            entries.remove(&key);
        }

        Ok(removed)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;

        entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);

        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, DomainError> {
        let now = self.clock.now();
        let ttl = self.config.ttl();
        let mut entries = self.entries.write().await;

        let before = count_entries(&entries);
        entries.retain(|_, group| {
            group.retain(|entry| !entry.is_expired(now, ttl));
            !group.is_empty()
        });
        let removed = before - count_entries(&entries);

        self.expirations.fetch_add(removed as u64, Ordering::Relaxed);

        Ok(removed)
    }

    async fn size(&self) -> Result<usize, DomainError> {
        Ok(count_entries(&*self.entries.read().await))
    }

    async fn stats(&self) -> Result<SimilarityCacheStats, DomainError> {
        let entries = self.entries.read().await;

        Ok(SimilarityCacheStats {
            total_entries: count_entries(&entries),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}
