//! Rate limit policies

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A rolling window: at most `limit` requests per `window_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitWindow {
    pub limit: u32,
    pub window_ms: u64,
}

impl RateLimitWindow {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    pub fn per_hour(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(3600))
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Windows plus cooldown applied to one `(action, identifier)` key
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    #[serde(default)]
    pub windows: Vec<RateLimitWindow>,
    /// Minimum time between two recorded requests, in milliseconds
    #[serde(default)]
    pub cooldown_ms: u64,
}

impl RateLimitPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single per-minute window
    pub fn per_minute(limit: u32) -> Self {
        Self::new().with_window(RateLimitWindow::per_minute(limit))
    }

    pub fn with_window(mut self, window: RateLimitWindow) -> Self {
        self.windows.push(window);
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown_ms = u64::try_from(cooldown.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Retention horizon for recorded timestamps
    pub fn longest_window(&self) -> Duration {
        self.windows
            .iter()
            .map(RateLimitWindow::window)
            .chain(std::iter::once(self.cooldown()))
            .max()
            .unwrap_or_default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.windows.is_empty() && self.cooldown_ms == 0
    }
}

/// Limits configured for one action
///
/// `windows` and `cooldown_ms` budget each identifier separately; `global`
/// is an action-wide ceiling shared by every identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionLimits {
    #[serde(default)]
    pub windows: Vec<RateLimitWindow>,
    #[serde(default)]
    pub cooldown_ms: u64,
    #[serde(default)]
    pub global: Option<RateLimitPolicy>,
}

impl ActionLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits with a per-identifier policy only
    pub fn per_identifier(policy: RateLimitPolicy) -> Self {
        Self {
            windows: policy.windows,
            cooldown_ms: policy.cooldown_ms,
            global: None,
        }
    }

    pub fn with_global(mut self, policy: RateLimitPolicy) -> Self {
        self.global = Some(policy);
        self
    }

    /// Per-identifier policy, if any window or cooldown is set
    pub fn identifier_policy(&self) -> Option<RateLimitPolicy> {
        let policy = RateLimitPolicy {
            windows: self.windows.clone(),
            cooldown_ms: self.cooldown_ms,
        };

        (!policy.is_unrestricted()).then_some(policy)
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Action-wide ceiling for actions without an explicit global policy
    #[serde(default = "default_requests_per_minute")]
    pub default_requests_per_minute: u32,

    #[serde(default)]
    pub actions: HashMap<String, ActionLimits>,

    /// How often idle records are swept, in seconds
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_requests_per_minute() -> u32 {
    50
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            default_requests_per_minute: default_requests_per_minute(),
            actions: HashMap::new(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl RateLimiterConfig {
    /// Global policy applied to actions without their own
    ///
    /// A zero default disables the implicit ceiling.
    pub fn default_global_policy(&self) -> Option<RateLimitPolicy> {
        if self.default_requests_per_minute == 0 {
            return None;
        }

        Some(RateLimitPolicy::per_minute(self.default_requests_per_minute))
    }

    pub fn with_action(mut self, action: impl Into<String>, limits: ActionLimits) -> Self {
        self.actions.insert(action.into(), limits);
        self
    }

    pub fn with_default_requests_per_minute(mut self, limit: u32) -> Self {
        self.default_requests_per_minute = limit;
        self
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_window_includes_cooldown() {
        let policy = RateLimitPolicy::per_minute(10)
            .with_window(RateLimitWindow::per_hour(100))
            .with_cooldown(Duration::from_secs(7200));

        assert_eq!(policy.longest_window(), Duration::from_secs(7200));
    }

    #[test]
    fn test_sub_second_window_is_kept() {
        let window = RateLimitWindow::new(2, Duration::from_millis(500));

        assert_eq!(window.window(), Duration::from_millis(500));
        assert!(!RateLimitPolicy::new().with_window(window).is_unrestricted());
    }

    #[test]
    fn test_unrestricted_policy() {
        assert!(RateLimitPolicy::new().is_unrestricted());
        assert!(!RateLimitPolicy::per_minute(1).is_unrestricted());
        assert_eq!(RateLimitPolicy::new().longest_window(), Duration::ZERO);
    }

    #[test]
    fn test_action_limits_without_identifier_policy() {
        let limits = ActionLimits::new().with_global(RateLimitPolicy::per_minute(5));

        assert_eq!(limits.identifier_policy(), None);
        assert!(limits.global.is_some());
    }

    #[test]
    fn test_default_global_policy() {
        let config = RateLimiterConfig::default();

        assert_eq!(
            config.default_global_policy(),
            Some(RateLimitPolicy::per_minute(50))
        );
        assert_eq!(
            config.with_default_requests_per_minute(0).default_global_policy(),
            None
        );
    }

    #[test]
    fn test_action_limits_from_json() {
        let json = r#"{
            "actions": {
                "post": {
                    "windows": [{"limit": 1, "window_ms": 600000}],
                    "cooldown_ms": 30000,
                    "global": {"windows": [{"limit": 10, "window_ms": 3600000}]}
                }
            }
        }"#;

        let config: RateLimiterConfig = serde_json::from_str(json).unwrap();
        let post = &config.actions["post"];

        let per_identifier = post.identifier_policy().unwrap();
        assert_eq!(per_identifier.windows[0].window(), Duration::from_secs(600));
        assert_eq!(per_identifier.cooldown(), Duration::from_secs(30));
        assert_eq!(post.global.as_ref().unwrap().windows[0].limit, 10);
        assert_eq!(config.default_requests_per_minute, 50);
    }
}
