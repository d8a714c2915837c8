//! Match request outcomes, errors and options

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::resonance::ScoredCandidate;
use crate::domain::retry::{RetryConfig, RetryError};
use crate::domain::DomainError;

/// Lifecycle stages of a match request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStage {
    CacheCheck,
    RateCheck,
    Fetch,
    Score,
    CacheWrite,
    Done,
}

impl fmt::Display for MatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CacheCheck => "cache_check",
            Self::RateCheck => "rate_check",
            Self::Fetch => "fetch",
            Self::Score => "score",
            Self::CacheWrite => "cache_write",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Successful (possibly degraded) result of a match request
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Served from the similarity cache
    Cached(Vec<ScoredCandidate>),
    /// Fetched, scored and cached
    Fresh(Vec<ScoredCandidate>),
    /// Denied by the rate limiter; try later
    ///
    /// `stale` holds expired cached data for the pattern when there was any.
    RateLimited {
        stale: Vec<ScoredCandidate>,
        retry_after: Duration,
    },
}

impl MatchOutcome {
    pub fn candidates(&self) -> &[ScoredCandidate] {
        match self {
            Self::Cached(candidates) | Self::Fresh(candidates) => candidates,
            Self::RateLimited { stale, .. } => stale,
        }
    }

    pub fn into_candidates(self) -> Vec<ScoredCandidate> {
        match self {
            Self::Cached(candidates) | Self::Fresh(candidates) => candidates,
            Self::RateLimited { stale, .. } => stale,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Metric/log label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cached(_) => "cached",
            Self::Fresh(_) => "fresh",
            Self::RateLimited { .. } => "rate_limited",
        }
    }
}

/// Terminal failure of a match request
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Invalid demand pattern: {0}")]
    InvalidPattern(#[source] DomainError),

    #[error("Candidate fetch failed permanently after {attempts} attempt(s): {source}")]
    Permanent {
        attempts: u32,
        #[source]
        source: DomainError,
    },

    /// Transient failures outlasted the retry budget
    ///
    /// `stale` holds expired cached data for the pattern when there was any.
    #[error("Candidate fetch failed after {attempts} attempts, try later: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: DomainError,
        stale: Vec<ScoredCandidate>,
    },
}

impl MatchError {
    /// Whether the caller may reasonably retry later
    pub fn is_try_later(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    /// Expired cached data a caller may degrade to
    pub fn stale(&self) -> &[ScoredCandidate] {
        match self {
            Self::RetriesExhausted { stale, .. } => stale,
            _ => &[],
        }
    }

    /// Map an executor failure, keeping stale data for the try-later case
    pub fn from_retry(error: RetryError, stale: Vec<ScoredCandidate>) -> Self {
        match error {
            RetryError::Permanent { attempts, source } => Self::Permanent { attempts, source },
            RetryError::Exhausted { attempts, source } => Self::RetriesExhausted {
                attempts,
                source,
                stale,
            },
        }
    }

    /// The underlying cause
    pub fn cause(&self) -> &DomainError {
        match self {
            Self::InvalidPattern(source)
            | Self::Permanent { source, .. }
            | Self::RetriesExhausted { source, .. } => source,
        }
    }
}

/// Per-call overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Rate-limit identifier; defaults to the candidate source name
    #[serde(default)]
    pub identifier: Option<String>,
    /// Retry settings for this call only
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::demand::Candidate;
    use crate::domain::resonance::ResonanceScore;

    #[test]
    fn test_retry_error_conversion() {
        let stale = vec![ScoredCandidate::new(
            Candidate::new("1", "Laptop", "electronics", 900.0),
            ResonanceScore::default(),
        )];

        let exhausted = MatchError::from_retry(
            RetryError::Exhausted {
                attempts: 3,
                source: DomainError::http(503, "down"),
            },
            stale.clone(),
        );
        let permanent = MatchError::from_retry(
            RetryError::Permanent {
                attempts: 1,
                source: DomainError::http(400, "bad"),
            },
            stale.clone(),
        );

        assert!(exhausted.is_try_later());
        assert_eq!(exhausted.stale(), stale.as_slice());
        assert!(!permanent.is_try_later());
        assert!(permanent.stale().is_empty());
        assert!(matches!(permanent.cause(), DomainError::Http { status: 400, .. }));
    }

    #[test]
    fn test_rate_limited_outcome_exposes_stale_data() {
        let outcome = MatchOutcome::RateLimited {
            stale: Vec::new(),
            retry_after: Duration::from_secs(12),
        };

        assert!(outcome.is_rate_limited());
        assert!(outcome.candidates().is_empty());
        assert_eq!(outcome.label(), "rate_limited");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(MatchStage::CacheCheck.to_string(), "cache_check");
        assert_eq!(MatchStage::CacheWrite.to_string(), "cache_write");
    }
}
