//! Rate limit check results

use std::fmt;
use std::time::Duration;

/// Which record a limit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    /// The `(action, identifier)` record
    Identifier,
    /// The action-wide `global` record
    Global,
}

impl fmt::Display for LimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier => write!(f, "identifier"),
            Self::Global => write!(f, "global"),
        }
    }
}

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    Window {
        scope: LimitScope,
        limit: u32,
        window: Duration,
    },
    Cooldown {
        scope: LimitScope,
        cooldown: Duration,
    },
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Window {
                scope,
                limit,
                window,
            } => write!(f, "{scope} limit of {limit} per {}s", window.as_secs()),
            Self::Cooldown { scope, cooldown } => {
                write!(f, "{scope} cooldown of {}ms", cooldown.as_millis())
            }
        }
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Time until the blocking condition clears (zero when allowed)
    pub retry_after: Duration,
    pub reason: Option<DenialReason>,
}

impl RateLimitResult {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after: Duration::ZERO,
            reason: None,
        }
    }

    pub fn denied(reason: DenialReason, retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after,
            reason: Some(reason),
        }
    }
}

/// Budget left in the tightest window of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitStatus {
    pub remaining: u32,
    pub limit: u32,
    pub window: Duration,
    /// Time until the oldest request in the window leaves it
    pub reset_in: Duration,
    pub scope: LimitScope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_reason_display() {
        let reason = DenialReason::Window {
            scope: LimitScope::Global,
            limit: 50,
            window: Duration::from_secs(60),
        };
        assert_eq!(reason.to_string(), "global limit of 50 per 60s");

        let reason = DenialReason::Cooldown {
            scope: LimitScope::Identifier,
            cooldown: Duration::from_millis(1500),
        };
        assert_eq!(reason.to_string(), "identifier cooldown of 1500ms");
    }

    #[test]
    fn test_allowed_result() {
        let result = RateLimitResult::allowed();

        assert!(result.allowed);
        assert!(result.reason.is_none());
        assert_eq!(result.retry_after, Duration::ZERO);
    }
}
