//! Domain layer - Core matching logic and entities

pub mod clock;
pub mod demand;
pub mod error;
pub mod matching;
pub mod rate_limit;
pub mod resonance;
pub mod retry;
pub mod similarity_cache;

pub use clock::{system_clock, Clock, ManualClock, SystemClock};
pub use demand::{Candidate, ContextSignal, DemandPattern, PatternKey, PriceRange};
pub use error::{DomainError, TransportErrorKind};
pub use matching::{CandidateSource, MatchError, MatchOptions, MatchOutcome, MatchStage};
pub use rate_limit::{
    ActionLimits, DenialReason, LimitScope, LimitStatus, RateLimitPolicy, RateLimitResult,
    RateLimitWindow, RateLimiterConfig,
};
pub use resonance::{
    ResonanceScore, ResonanceScorer, ResonanceState, ResonanceVector, ScoredCandidate,
    ScoringWeights, VectorExtractor,
};
pub use retry::{classify, ErrorClass, RetryConfig, RetryError, RetryExecutor, RetryPreset};
pub use similarity_cache::{
    CacheLookup, SimilarityCache, SimilarityCacheConfig, SimilarityCacheStats,
};
