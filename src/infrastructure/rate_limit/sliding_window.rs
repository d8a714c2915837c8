//! Rate limiter implementation
//!
//! Provides sliding window rate limiting per `(action, identifier)` with an
//! optional cooldown and an action-wide ceiling recorded under the
//! [`GLOBAL_IDENTIFIER`] pseudo-identifier.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::Instant;
use tracing::debug;

use crate::domain::rate_limit::{
    ActionLimits, DenialReason, LimitScope, LimitStatus, RateLimitPolicy, RateLimitResult,
    RateLimiterConfig,
};
use crate::domain::Clock;

/// Identifier under which action-wide requests are recorded
pub const GLOBAL_IDENTIFIER: &str = "global";

type RecordKey = (String, String);
type Timestamps = Arc<Mutex<VecDeque<Instant>>>;

/// One record that a request must pass
struct Gate {
    scope: LimitScope,
    policy: RateLimitPolicy,
    timestamps: Timestamps,
}

/// Sliding window rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    /// Configured limits by action
    policies: RwLock<HashMap<String, ActionLimits>>,
    /// Ceiling for actions without their own global policy
    default_global: Option<RateLimitPolicy>,
    /// Per-key request timestamps, oldest first
    records: RwLock<HashMap<RecordKey, Timestamps>>,
    clock: Arc<dyn Clock>,
    cleanup_interval: Duration,
    last_cleanup: Mutex<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();

        Self {
            default_global: config.default_global_policy(),
            cleanup_interval: config.cleanup_interval(),
            policies: RwLock::new(config.actions),
            records: RwLock::new(HashMap::new()),
            clock,
            last_cleanup: Mutex::new(now),
        }
    }

    /// Whether a request would currently be allowed
    pub async fn can_make_request(&self, action: &str, identifier: &str) -> bool {
        self.check(action, identifier).await.allowed
    }

    /// Check the limits without recording anything
    pub async fn check(&self, action: &str, identifier: &str) -> RateLimitResult {
        self.maybe_cleanup().await;

        let gates = self.gates(action, identifier).await;
        let now = self.clock.now();

        let mut guards = Vec::with_capacity(gates.len());
        for gate in &gates {
            guards.push(gate.timestamps.lock().await);
        }

        match longest_denial(&gates, &mut guards, now) {
            Some((reason, retry_after)) => RateLimitResult::denied(reason, retry_after),
            None => RateLimitResult::allowed(),
        }
    }

    /// Record a request against the identifier and the action-wide record
    pub async fn record_request(&self, action: &str, identifier: &str) {
        let gates = self.gates(action, identifier).await;
        let now = self.clock.now();

        for gate in &gates {
            gate.timestamps.lock().await.push_back(now);
        }
    }

    /// Check and record in one operation
    ///
    /// Every record involved stays locked between the check and the write,
    /// so concurrent callers cannot overshoot a limit.
    pub async fn try_acquire(&self, action: &str, identifier: &str) -> RateLimitResult {
        self.maybe_cleanup().await;

        let gates = self.gates(action, identifier).await;

        // Lock order: identifier record, then global record
        let mut guards = Vec::with_capacity(gates.len());
        for gate in &gates {
            guards.push(gate.timestamps.lock().await);
        }

        let now = self.clock.now();
        if let Some((reason, retry_after)) = longest_denial(&gates, &mut guards, now) {
            debug!(
                action,
                identifier,
                reason = %reason,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            return RateLimitResult::denied(reason, retry_after);
        }

        for timestamps in guards.iter_mut() {
            timestamps.push_back(now);
        }

        RateLimitResult::allowed()
    }

    /// Remaining budget in the tightest window for a key
    ///
    /// Returns `None` when no windowed policy applies.
    pub async fn get_limit_status(&self, action: &str, identifier: &str) -> Option<LimitStatus> {
        let gates = self.gates(action, identifier).await;
        let now = self.clock.now();

        let mut tightest: Option<LimitStatus> = None;

        for gate in &gates {
            let timestamps = gate.timestamps.lock().await;

            for window in &gate.policy.windows {
                let span = window.window();
                let mut in_window = timestamps
                    .iter()
                    .filter(|t| now.saturating_duration_since(**t) < span);

                let oldest = in_window.next().copied();
                let count = oldest.map_or(0, |_| 1 + in_window.count() as u32);

                let status = LimitStatus {
                    remaining: window.limit.saturating_sub(count),
                    limit: window.limit,
                    window: span,
                    reset_in: oldest
                        .map(|t| span.saturating_sub(now.saturating_duration_since(t)))
                        .unwrap_or_default(),
                    scope: gate.scope,
                };

                if tightest.is_none_or(|current| status.remaining < current.remaining) {
                    tightest = Some(status);
                }
            }
        }

        tightest
    }

    /// Set the per-identifier policy of an action
    pub async fn set_config(&self, action: &str, policy: RateLimitPolicy) {
        let mut policies = self.policies.write().await;
        let limits = policies.entry(action.to_string()).or_default();

        limits.windows = policy.windows;
        limits.cooldown_ms = policy.cooldown_ms;
    }

    /// Set the action-wide ceiling of an action
    pub async fn set_global_config(&self, action: &str, policy: RateLimitPolicy) {
        let mut policies = self.policies.write().await;
        policies.entry(action.to_string()).or_default().global = Some(policy);
    }

    /// Clear the record of a key
    pub async fn reset(&self, action: &str, identifier: &str) {
        let mut records = self.records.write().await;
        records.remove(&(action.to_string(), identifier.to_string()));
    }

    /// Policies that apply to a key, identifier scope first
    async fn resolve(&self, action: &str, identifier: &str) -> Vec<(LimitScope, RateLimitPolicy)> {
        let policies = self.policies.read().await;
        let limits = policies.get(action);

        let global = limits
            .and_then(|limits| limits.global.clone())
            .or_else(|| self.default_global.clone())
            .filter(|policy| !policy.is_unrestricted());

        let mut resolved = Vec::with_capacity(2);

        if identifier != GLOBAL_IDENTIFIER {
            if let Some(policy) = limits.and_then(ActionLimits::identifier_policy) {
                resolved.push((LimitScope::Identifier, policy));
            }
        }

        if let Some(policy) = global {
            resolved.push((LimitScope::Global, policy));
        }

        resolved
    }

    async fn gates(&self, action: &str, identifier: &str) -> Vec<Gate> {
        let resolved = self.resolve(action, identifier).await;
        if resolved.is_empty() {
            return Vec::new();
        }

        let mut records = self.records.write().await;

        resolved
            .into_iter()
            .map(|(scope, policy)| {
                let record_identifier = match scope {
                    LimitScope::Identifier => identifier,
                    LimitScope::Global => GLOBAL_IDENTIFIER,
                };
                let timestamps = records
                    .entry((action.to_string(), record_identifier.to_string()))
                    .or_default()
                    .clone();

                Gate {
                    scope,
                    policy,
                    timestamps,
                }
            })
            .collect()
    }

    /// Drop records with nothing left inside their retention horizon
    async fn maybe_cleanup(&self) {
        let now = self.clock.now();

        {
            let mut last_cleanup = self.last_cleanup.lock().await;
            if now.saturating_duration_since(*last_cleanup) < self.cleanup_interval {
                return;
            }
            *last_cleanup = now;
        }

        let mut horizons = HashMap::new();
        {
            let keys: Vec<RecordKey> = self.records.read().await.keys().cloned().collect();
            for (action, identifier) in keys {
                let horizon = self
                    .resolve(&action, &identifier)
                    .await
                    .iter()
                    .map(|(_, policy)| policy.longest_window())
                    .max()
                    .unwrap_or_default();
                horizons.insert((action, identifier), horizon);
            }
        }

        let mut records = self.records.write().await;
        let before = records.len();

        records.retain(|key, timestamps| {
            // Held by an in-flight request
            if Arc::strong_count(timestamps) > 1 {
                return true;
            }
            let Ok(mut timestamps) = timestamps.try_lock() else {
                return true;
            };
            let horizon = horizons.get(key).copied().unwrap_or_default();
            prune(&mut timestamps, now, horizon);
            !timestamps.is_empty()
        });

        let removed = before - records.len();
        if removed > 0 {
            debug!(removed, "Cleaned up idle rate limit records");
        }
    }
}

/// Remove timestamps that no window or cooldown can see any more
fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, horizon: Duration) {
    while timestamps
        .front()
        .is_some_and(|t| now.saturating_duration_since(*t) >= horizon)
    {
        timestamps.pop_front();
    }
}

/// The denial that takes longest to clear across all gates
fn longest_denial(
    gates: &[Gate],
    guards: &mut [MutexGuard<'_, VecDeque<Instant>>],
    now: Instant,
) -> Option<(DenialReason, Duration)> {
    gates
        .iter()
        .zip(guards.iter_mut())
        .filter_map(|(gate, timestamps)| evaluate(gate, timestamps, now))
        .max_by_key(|(_, retry_after)| *retry_after)
}

/// Denial with the time until it clears, if the gate blocks
fn evaluate(
    gate: &Gate,
    timestamps: &mut VecDeque<Instant>,
    now: Instant,
) -> Option<(DenialReason, Duration)> {
    prune(timestamps, now, gate.policy.longest_window());

    let mut denial: Option<(DenialReason, Duration)> = None;
    let mut deny = |reason: DenialReason, retry_after: Duration| {
        if denial.is_none_or(|(_, current)| retry_after > current) {
            denial = Some((reason, retry_after));
        }
    };

    for window in &gate.policy.windows {
        let span = window.window();
        let mut in_window = timestamps
            .iter()
            .filter(|t| now.saturating_duration_since(**t) < span);

        let oldest = in_window.next().copied();
        let count = oldest.map_or(0, |_| 1 + in_window.count() as u32);

        if count >= window.limit {
            let retry_after = oldest
                .map(|t| span.saturating_sub(now.saturating_duration_since(t)))
                .unwrap_or(span);

            deny(
                DenialReason::Window {
                    scope: gate.scope,
                    limit: window.limit,
                    window: span,
                },
                retry_after,
            );
        }
    }

    let cooldown = gate.policy.cooldown();
    if !cooldown.is_zero() {
        if let Some(last) = timestamps.back() {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < cooldown {
                deny(
                    DenialReason::Cooldown {
                        scope: gate.scope,
                        cooldown,
                    },
                    cooldown - elapsed,
                );
            }
        }
    }

    denial
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rate_limit::RateLimitWindow;
    use crate::domain::ManualClock;

    fn limiter(config: RateLimiterConfig) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new();
        (RateLimiter::new(config, Arc::new(clock.clone())), clock)
    }

    fn unbounded_config() -> RateLimiterConfig {
        RateLimiterConfig::default().with_default_requests_per_minute(0)
    }

    #[tokio::test]
    async fn test_one_per_minute() {
        let (limiter, clock) = limiter(unbounded_config());
        limiter.set_config("search", RateLimitPolicy::per_minute(1)).await;

        assert!(limiter.can_make_request("search", "awin").await);
        limiter.record_request("search", "awin").await;
        assert!(!limiter.can_make_request("search", "awin").await);

        clock.advance(Duration::from_secs(60));
        assert!(limiter.can_make_request("search", "awin").await);
    }

    #[tokio::test]
    async fn test_sub_second_window_limits() {
        let (limiter, clock) = limiter(unbounded_config());
        let burst = RateLimitPolicy::new()
            .with_window(RateLimitWindow::new(1, Duration::from_millis(500)));
        limiter.set_config("search", burst).await;

        assert!(limiter.try_acquire("search", "awin").await.allowed);

        let denied = limiter.try_acquire("search", "awin").await;
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Duration::from_millis(500));

        clock.advance(Duration::from_millis(500));
        assert!(limiter.try_acquire("search", "awin").await.allowed);
    }

    #[tokio::test]
    async fn test_denial_reports_retry_after() {
        let (limiter, clock) = limiter(unbounded_config());
        limiter.set_config("search", RateLimitPolicy::per_minute(1)).await;

        assert!(limiter.try_acquire("search", "awin").await.allowed);
        clock.advance(Duration::from_secs(20));

        let result = limiter.try_acquire("search", "awin").await;
        assert!(!result.allowed);
        assert_eq!(result.retry_after, Duration::from_secs(40));
        assert_eq!(
            result.reason,
            Some(DenialReason::Window {
                scope: LimitScope::Identifier,
                limit: 1,
                window: Duration::from_secs(60),
            })
        );
    }

    #[tokio::test]
    async fn test_independent_keys() {
        let (limiter, _clock) = limiter(unbounded_config());
        limiter.set_config("search", RateLimitPolicy::per_minute(1)).await;

        assert!(limiter.try_acquire("search", "a").await.allowed);
        assert!(limiter.try_acquire("search", "b").await.allowed);
        assert!(!limiter.try_acquire("search", "a").await.allowed);
        // other actions have no policy
        assert!(limiter.try_acquire("lookup", "a").await.allowed);
    }

    #[tokio::test]
    async fn test_multiple_windows() {
        let (limiter, clock) = limiter(unbounded_config());
        let policy = RateLimitPolicy::per_minute(2).with_window(RateLimitWindow::per_hour(3));
        limiter.set_config("search", policy).await;

        assert!(limiter.try_acquire("search", "a").await.allowed);
        assert!(limiter.try_acquire("search", "a").await.allowed);
        assert!(!limiter.try_acquire("search", "a").await.allowed);

        clock.advance(Duration::from_secs(61));
        assert!(limiter.try_acquire("search", "a").await.allowed);

        let result = limiter.try_acquire("search", "a").await;
        assert!(!result.allowed);
        assert!(matches!(
            result.reason,
            Some(DenialReason::Window { limit: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_global_ceiling_spans_identifiers() {
        let (limiter, _clock) = limiter(unbounded_config());
        limiter.set_global_config("search", RateLimitPolicy::per_minute(2)).await;

        assert!(limiter.try_acquire("search", "a").await.allowed);
        assert!(limiter.try_acquire("search", "b").await.allowed);

        let result = limiter.try_acquire("search", "c").await;
        assert!(!result.allowed);
        assert!(matches!(
            result.reason,
            Some(DenialReason::Window {
                scope: LimitScope::Global,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_default_global_ceiling() {
        let (limiter, _clock) = limiter(RateLimiterConfig::default());

        for i in 0..50 {
            assert!(limiter.try_acquire("anything", &format!("id-{}", i)).await.allowed);
        }

        assert!(!limiter.try_acquire("anything", "id-50").await.allowed);
    }

    #[tokio::test]
    async fn test_cooldown() {
        let (limiter, clock) = limiter(unbounded_config());
        let policy = RateLimitPolicy::new().with_cooldown(Duration::from_secs(2));
        limiter.set_config("search", policy).await;

        assert!(limiter.try_acquire("search", "a").await.allowed);

        clock.advance(Duration::from_secs(1));
        let result = limiter.try_acquire("search", "a").await;
        assert!(!result.allowed);
        assert_eq!(result.retry_after, Duration::from_secs(1));
        assert!(matches!(result.reason, Some(DenialReason::Cooldown { .. })));

        clock.advance(Duration::from_secs(1));
        assert!(limiter.try_acquire("search", "a").await.allowed);
    }

    #[tokio::test]
    async fn test_check_does_not_record() {
        let (limiter, _clock) = limiter(unbounded_config());
        limiter.set_config("search", RateLimitPolicy::per_minute(1)).await;

        assert!(limiter.check("search", "a").await.allowed);
        assert!(limiter.check("search", "a").await.allowed);
        assert!(limiter.try_acquire("search", "a").await.allowed);
    }

    #[tokio::test]
    async fn test_limit_status() {
        let (limiter, clock) = limiter(unbounded_config());
        limiter.set_config("search", RateLimitPolicy::per_minute(5)).await;

        limiter.record_request("search", "a").await;
        clock.advance(Duration::from_secs(15));
        limiter.record_request("search", "a").await;

        let status = limiter.get_limit_status("search", "a").await.unwrap();
        assert_eq!(status.remaining, 3);
        assert_eq!(status.limit, 5);
        assert_eq!(status.reset_in, Duration::from_secs(45));
        assert_eq!(status.scope, LimitScope::Identifier);

        assert!(limiter.get_limit_status("other", "a").await.is_none());
    }

    #[tokio::test]
    async fn test_limit_status_picks_tightest_window() {
        let (limiter, _clock) = limiter(unbounded_config());
        limiter.set_config("search", RateLimitPolicy::per_minute(10)).await;
        limiter.set_global_config("search", RateLimitPolicy::per_minute(3)).await;

        limiter.record_request("search", "a").await;
        limiter.record_request("search", "b").await;

        let status = limiter.get_limit_status("search", "a").await.unwrap();
        assert_eq!(status.remaining, 1);
        assert_eq!(status.scope, LimitScope::Global);
    }

    #[tokio::test]
    async fn test_reset() {
        let (limiter, _clock) = limiter(unbounded_config());
        limiter.set_config("search", RateLimitPolicy::per_minute(1)).await;

        limiter.record_request("search", "a").await;
        assert!(!limiter.can_make_request("search", "a").await);

        limiter.reset("search", "a").await;
        assert!(limiter.can_make_request("search", "a").await);
    }

    #[tokio::test]
    async fn test_concurrent_try_acquire_respects_limit() {
        let (limiter, _clock) = limiter(unbounded_config());
        limiter.set_config("search", RateLimitPolicy::per_minute(5)).await;
        let limiter = Arc::new(limiter);

        let handles = (0..20).map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.try_acquire("search", "a").await.allowed })
        });

        let allowed = futures::future::join_all(handles)
            .await
            .into_iter()
            .filter(|result| *result.as_ref().unwrap())
            .count();

        assert_eq!(allowed, 5);
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_records() {
        let config = unbounded_config();
        let interval = config.cleanup_interval();
        let (limiter, clock) = limiter(config);
        limiter.set_config("search", RateLimitPolicy::per_minute(1)).await;

        limiter.record_request("search", "a").await;
        assert_eq!(limiter.records.read().await.len(), 1);

        clock.advance(interval);
        limiter.check("lookup", "b").await;

        assert!(limiter.records.read().await.is_empty());
    }
}
