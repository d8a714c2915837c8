//! Demand matching orchestration
//!
//! Runs one request through cache check, rate check, fetch (with retry),
//! scoring and cache write.

use std::fmt;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::demand::DemandPattern;
use crate::domain::matching::{CandidateSource, MatchError, MatchOptions, MatchOutcome, MatchStage};
use crate::domain::resonance::{ResonanceScorer, ScoredCandidate};
use crate::domain::retry::{RetryError, RetryExecutor};
use crate::domain::similarity_cache::{CacheLookup, SimilarityCache};
use crate::infrastructure::rate_limit::RateLimiter;

/// Rate-limit action used when none is configured
pub const DEFAULT_ACTION: &str = "product_search";

/// Composes cache, rate limiter, retry executor and scorer around a source
pub struct MatchingOrchestrator {
    cache: Arc<dyn SimilarityCache>,
    rate_limiter: Arc<RateLimiter>,
    retry: RetryExecutor,
    scorer: ResonanceScorer,
    source: Arc<dyn CandidateSource>,
    action: String,
}

impl fmt::Debug for MatchingOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchingOrchestrator")
            .field("cache", &self.cache)
            .field("rate_limiter", &self.rate_limiter)
            .field("retry", &self.retry)
            .field("scorer", &self.scorer)
            .field("source", &self.source.source_name())
            .field("action", &self.action)
            .finish()
    }
}

impl MatchingOrchestrator {
    pub fn new(
        cache: Arc<dyn SimilarityCache>,
        rate_limiter: Arc<RateLimiter>,
        retry: RetryExecutor,
        scorer: ResonanceScorer,
        source: Arc<dyn CandidateSource>,
    ) -> Self {
        Self {
            cache,
            rate_limiter,
            retry,
            scorer,
            source,
            action: DEFAULT_ACTION.to_string(),
        }
    }

    /// Rate-limit action requests are counted against
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn cache(&self) -> &Arc<dyn SimilarityCache> {
        &self.cache
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Match a pattern with default options
    pub async fn match_demand(&self, pattern: &DemandPattern) -> Result<MatchOutcome, MatchError> {
        self.match_with(pattern, &MatchOptions::default()).await
    }

    /// Match a pattern with per-call overrides
    pub async fn match_with(
        &self,
        pattern: &DemandPattern,
        options: &MatchOptions,
    ) -> Result<MatchOutcome, MatchError> {
        let span = info_span!(
            "match_demand",
            request_id = %Uuid::new_v4(),
            action = %self.action,
            term = pattern.search_term(),
            category = pattern.category(),
        );

        self.run(pattern, options).instrument(span).await
    }

    async fn run(
        &self,
        pattern: &DemandPattern,
        options: &MatchOptions,
    ) -> Result<MatchOutcome, MatchError> {
        counter!("matcher_requests_total").increment(1);

        if let Err(e) = pattern.validate() {
            warn!(error = %e, "Rejected demand pattern");
            return Err(MatchError::InvalidPattern(e));
        }

        debug!(stage = %MatchStage::CacheCheck, "Checking cache");
        let stale = match self.cache.lookup(pattern).await {
            Ok(CacheLookup::Hit(candidates)) => {
                return Ok(self.done(MatchOutcome::Cached(candidates)));
            }
            Ok(CacheLookup::Stale(candidates)) => candidates,
            Ok(CacheLookup::Miss) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Cache lookup failed, continuing without cache");
                Vec::new()
            }
        };

        let identifier = options
            .identifier
            .as_deref()
            .unwrap_or_else(|| self.source.source_name());

        debug!(stage = %MatchStage::RateCheck, identifier, "Checking rate limits");
        let permit = self.rate_limiter.try_acquire(&self.action, identifier).await;
        if !permit.allowed {
            counter!("matcher_rate_limited_total", "action" => self.action.clone()).increment(1);
            warn!(
                identifier,
                retry_after_ms = permit.retry_after.as_millis() as u64,
                reason = ?permit.reason,
                stale = stale.len(),
                "Rate limited, try later"
            );
            return Ok(self.done(MatchOutcome::RateLimited {
                stale,
                retry_after: permit.retry_after,
            }));
        }

        debug!(stage = %MatchStage::Fetch, source = self.source.source_name(), "Fetching candidates");
        let config = options.retry.as_ref().unwrap_or_else(|| self.retry.config());
        let source = &self.source;
        let candidates = self
            .retry
            .execute_with(|| source.fetch_candidates(pattern), config)
            .await
            .map_err(|e| self.fetch_failed(e, stale))?;

        debug!(stage = %MatchStage::Score, candidates = candidates.len(), "Scoring candidates");
        let ranked = self.scorer.score_all(candidates, pattern);

        debug!(stage = %MatchStage::CacheWrite, "Writing cache");
        self.write_cache(pattern, &ranked).await;

        Ok(self.done(MatchOutcome::Fresh(ranked)))
    }

    /// Cache write failures never fail the request
    async fn write_cache(&self, pattern: &DemandPattern, ranked: &[ScoredCandidate]) {
        if let Err(e) = self.cache.set(pattern, ranked.to_vec()).await {
            warn!(error = %e, "Failed to cache match results");
        }
    }

    fn fetch_failed(&self, e: RetryError, stale: Vec<ScoredCandidate>) -> MatchError {
        let class = if e.is_exhausted() { "exhausted" } else { "permanent" };
        counter!("matcher_fetch_failures_total", "class" => class).increment(1);
        error!(
            attempts = e.attempts(),
            class,
            error = %e.cause(),
            stale = stale.len(),
            "Candidate fetch failed"
        );

        MatchError::from_retry(e, stale)
    }

    fn done(&self, outcome: MatchOutcome) -> MatchOutcome {
        counter!("matcher_outcomes_total", "outcome" => outcome.label()).increment(1);
        info!(
            stage = %MatchStage::Done,
            outcome = outcome.label(),
            candidates = outcome.candidates().len(),
            "Match request completed"
        );
        outcome
    }
}
