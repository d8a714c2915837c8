//! Demand Matcher
//!
//! A reliability layer for demand-to-supply matching:
//! - Similarity cache keyed by demand pattern, with TTL
//! - Multi-window rate limiting with cooldowns and action-wide ceilings
//! - Classified retry with exponential backoff and per-attempt timeouts
//! - Resonance scoring and ranking of candidates

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use self::config::AppConfig;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use domain::{system_clock, CandidateSource, DomainError, ResonanceScorer, RetryExecutor};
use infrastructure::rate_limit::RateLimiter;
use infrastructure::services::MatchingOrchestrator;
use infrastructure::similarity_cache::InMemorySimilarityCache;
use infrastructure::source::{HttpCandidateSource, InMemoryCandidateSource};

/// Assemble an orchestrator from configuration around a candidate source
pub fn build_orchestrator(
    config: &AppConfig,
    source: Arc<dyn CandidateSource>,
) -> MatchingOrchestrator {
    let clock = system_clock();
    let cache = Arc::new(InMemorySimilarityCache::new(
        config.cache.clone(),
        clock.clone(),
    ));
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone(), clock));

    MatchingOrchestrator::new(
        cache,
        rate_limiter,
        RetryExecutor::new(config.retry.resolve()),
        ResonanceScorer::new(config.scoring),
        source,
    )
    .with_action(config.matching.action.clone())
}

/// Pick the candidate source
///
/// An explicit fixture file wins, then `source.base_url`, then
/// `source.fixtures`.
pub fn build_candidate_source(
    config: &AppConfig,
    fixtures: Option<&Path>,
) -> Result<Arc<dyn CandidateSource>, DomainError> {
    if let Some(path) = fixtures {
        return load_fixtures(path);
    }

    if let Some(base_url) = &config.source.base_url {
        let mut source = HttpCandidateSource::new(base_url)
            .with_limit(config.source.limit)
            .with_timeout(config.source.timeout())?;

        if let Some(api_key) = &config.source.api_key {
            source = source.with_api_key(api_key);
        }

        info!(base_url = %source.base_url(), "Using HTTP candidate source");
        return Ok(Arc::new(source));
    }

    if let Some(path) = &config.source.fixtures {
        return load_fixtures(Path::new(path));
    }

    Err(DomainError::configuration(
        "No candidate source configured: set source.base_url or provide a fixture catalog",
    ))
}

fn load_fixtures(path: &Path) -> Result<Arc<dyn CandidateSource>, DomainError> {
    let source = InMemoryCandidateSource::from_json_file(path)?;
    info!(path = %path.display(), candidates = source.len(), "Using fixture candidate source");

    Ok(Arc::new(source))
}
