//! Retry configuration and presets

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Backoff and timeout settings for a retried call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay
    pub max_delay_ms: u64,
    /// Multiplier applied per attempt
    pub backoff_factor: f64,
    /// Per-attempt timeout (0 = no limit)
    pub timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10000,
            backoff_factor: 2.0,
            timeout_ms: 30000,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_initial_delay(mut self, ms: u64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    pub fn with_max_delay(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Attempts actually made; a zero setting still runs the operation once
    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Delay after the given failed attempt (1-indexed)
    ///
    /// `min(initial × factor^(attempt-1), max)`. Factors below 1 are read as
    /// 1 so delays never shrink.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = if self.backoff_factor.is_finite() {
            self.backoff_factor.max(1.0)
        } else {
            1.0
        };

        let delay = self.initial_delay_ms as f64 * factor.powi(exponent);
        let delay_ms = delay.min(self.max_delay_ms as f64).max(0.0) as u64;

        Duration::from_millis(delay_ms)
    }

    /// All delays an exhausting run would wait, in order
    pub fn delays(&self) -> Vec<Duration> {
        (1..self.effective_max_attempts())
            .map(|attempt| self.delay_for_attempt(attempt))
            .collect()
    }
}

/// Named retry profiles for call sites with different risk tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryPreset {
    #[default]
    Standard,
    /// Slightly more patient than standard, for flaky but important upstreams
    Adaptive,
    /// Many quick retries, for cheap idempotent reads
    Aggressive,
    /// Few slow retries, for upstreams that punish bursts
    Gentle,
}

impl RetryPreset {
    pub fn config(&self) -> RetryConfig {
        match self {
            Self::Standard => RetryConfig::default(),
            Self::Adaptive => RetryConfig::new(4)
                .with_initial_delay(1000)
                .with_max_delay(15000)
                .with_backoff_factor(2.0)
                .with_timeout(30000),
            Self::Aggressive => RetryConfig::new(5)
                .with_initial_delay(500)
                .with_max_delay(5000)
                .with_backoff_factor(1.5)
                .with_timeout(15000),
            Self::Gentle => RetryConfig::new(2)
                .with_initial_delay(2000)
                .with_max_delay(30000)
                .with_backoff_factor(3.0)
                .with_timeout(60000),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Adaptive => "adaptive",
            Self::Aggressive => "aggressive",
            Self::Gentle => "gentle",
        }
    }
}

impl fmt::Display for RetryPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryPreset {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "default" => Ok(Self::Standard),
            "adaptive" => Ok(Self::Adaptive),
            "aggressive" => Ok(Self::Aggressive),
            "gentle" => Ok(Self::Gentle),
            other => Err(DomainError::configuration(format!(
                "Unknown retry preset '{}'",
                other
            ))),
        }
    }
}
