//! Rate limiting domain models
//!
//! Policies are rolling windows plus an optional cooldown, applied per
//! `(action, identifier)` key with an optional action-wide ceiling.

mod policy;
mod status;

pub use policy::{ActionLimits, RateLimitPolicy, RateLimitWindow, RateLimiterConfig};
pub use status::{DenialReason, LimitScope, LimitStatus, RateLimitResult};
