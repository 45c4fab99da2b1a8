//! Fixed-window rate limiter keyed by (capability, client identity)
//!
//! Windows are aligned to multiples of the window length since the Unix
//! epoch, so every client's daily window resets at the same instant. Each
//! key gets its own record, created lazily on first use and replaced when
//! its window has elapsed. The check and the increment happen while holding
//! the map shard's write guard, so concurrent callers sharing a key can never
//! be allowed more than `limit` times in one window.

use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Identity used when a request carries no network-origin hint
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Unit of independent rate-limit budgeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Chat,
    Translate,
    Stt,
    Tts,
    Vision,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Chat,
        Capability::Translate,
        Capability::Stt,
        Capability::Tts,
        Capability::Vision,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Chat => "chat",
            Capability::Translate => "translate",
            Capability::Stt => "stt",
            Capability::Tts => "tts",
            Capability::Vision => "vision",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best available identity of the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            Self::anonymous()
        } else {
            Self(trimmed.to_string())
        }
    }

    /// Shared fallback identity; every caller without a hint shares one budget
    pub fn anonymous() -> Self {
        Self(ANONYMOUS_CLIENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS_CLIENT
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one check-and-consume call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Window end in epoch milliseconds
    pub fn reset_epoch_millis(&self) -> i64 {
        self.reset_at.timestamp_millis()
    }
}

/// Limits and window length
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    /// Disabled policies allow everything and record nothing
    pub enabled: bool,
    pub window: Duration,
    pub limits: HashMap<Capability, u32>,
}

impl RateLimitPolicy {
    pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    /// Policy with a one-day window and no limits set
    pub fn daily() -> Self {
        Self {
            enabled: true,
            window: Self::DAY,
            limits: HashMap::new(),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_limit(mut self, capability: Capability, limit: u32) -> Self {
        self.limits.insert(capability, limit);
        self
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Limit for a capability; capabilities without an entry get no budget
    pub fn limit_for(&self, capability: Capability) -> u32 {
        self.limits.get(&capability).copied().unwrap_or(0)
    }

    fn window_millis(&self) -> i64 {
        (self.window.as_millis() as i64).max(1)
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::daily()
            .with_limit(Capability::Chat, 100)
            .with_limit(Capability::Translate, 20)
            .with_limit(Capability::Stt, 15)
            .with_limit(Capability::Tts, 15)
            .with_limit(Capability::Vision, 15)
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    window_start: DateTime<Utc>,
    count: u32,
}

/// Process-wide fixed-window counter map
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    windows: DashMap<(Capability, ClientIdentity), WindowRecord>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            windows: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Check the budget and consume one unit if any is left
    pub fn check_and_consume(
        &self,
        capability: Capability,
        client: &ClientIdentity,
    ) -> RateLimitDecision {
        self.check_and_consume_at(capability, client, Utc::now())
    }

    /// Same as [`check_and_consume`](Self::check_and_consume) with an explicit clock
    pub fn check_and_consume_at(
        &self,
        capability: Capability,
        client: &ClientIdentity,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let limit = self.policy.limit_for(capability);
        let window_start = self.window_start(now);
        let reset_at = window_start + chrono::Duration::milliseconds(self.policy.window_millis());

        if !self.policy.enabled {
            return RateLimitDecision {
                allowed: true,
                limit,
                remaining: limit,
                reset_at,
            };
        }

        // The entry guard holds the shard write lock until it is dropped
        let mut record = self
            .windows
            .entry((capability, client.clone()))
            .or_insert(WindowRecord {
                window_start,
                count: 0,
            });

        if record.window_start != window_start {
            record.window_start = window_start;
            record.count = 0;
        }

        let allowed = record.count < limit;
        if allowed {
            record.count += 1;
        }
        let remaining = limit.saturating_sub(record.count);
        drop(record);

        if !allowed {
            tracing::warn!(
                capability = %capability,
                client = %client,
                limit,
                reset_at = %reset_at,
                "Rate limit exceeded"
            );
        }

        RateLimitDecision {
            allowed,
            limit,
            remaining: if allowed { remaining } else { 0 },
            reset_at,
        }
    }

    /// Drop records whose window has ended
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let current = self.window_start(now);
        let before = self.windows.len();
        self.windows.retain(|_, record| record.window_start >= current);
        before.saturating_sub(self.windows.len())
    }

    /// Number of live (capability, client) records
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let window = self.policy.window_millis();
        let start = now.timestamp_millis().div_euclid(window) * window;
        Utc.timestamp_millis_opt(start).single().unwrap_or(now)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let limiter = RateLimiter::new(RateLimitPolicy::daily().with_limit(Capability::Stt, 15));
        let client = ClientIdentity::new("ip-1");
        let now = ts("2024-05-01T09:00:00Z");

        for call in 1..=15 {
            let decision = limiter.check_and_consume_at(Capability::Stt, &client, now);
            assert!(decision.allowed, "call {} should be allowed", call);
            assert_eq!(decision.remaining, 15 - call);
        }

        let decision = limiter.check_and_consume_at(Capability::Stt, &client, now);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.limit, 15);
        assert_eq!(decision.reset_at, ts("2024-05-02T00:00:00Z"));
    }

    #[test]
    fn test_window_reset() {
        let limiter = RateLimiter::new(RateLimitPolicy::daily().with_limit(Capability::Tts, 1));
        let client = ClientIdentity::new("ip-2");

        let attempt = |at: &str| limiter.check_and_consume_at(Capability::Tts, &client, ts(at));
        assert!(attempt("2024-05-01T23:59:00Z").allowed);
        assert!(!attempt("2024-05-01T23:59:59Z").allowed);
        assert!(attempt("2024-05-02T00:00:01Z").allowed);
    }

    #[test]
    fn test_capabilities_and_clients_are_independent() {
        let limiter = RateLimiter::new(
            RateLimitPolicy::daily()
                .with_limit(Capability::Translate, 1)
                .with_limit(Capability::Vision, 1),
        );
        let a = ClientIdentity::new("a");
        let b = ClientIdentity::new("b");
        let now = ts("2024-05-01T12:00:00Z");

        assert!(limiter.check_and_consume_at(Capability::Translate, &a, now).allowed);
        assert!(limiter.check_and_consume_at(Capability::Vision, &a, now).allowed);
        assert!(limiter.check_and_consume_at(Capability::Translate, &b, now).allowed);
        assert!(!limiter.check_and_consume_at(Capability::Translate, &a, now).allowed);
    }

    #[test]
    fn test_rate_limiter_disabled() {
        let limiter = RateLimiter::new(RateLimitPolicy::disabled());
        let client = ClientIdentity::anonymous();
        for _ in 0..1000 {
            assert!(limiter.check_and_consume(Capability::Chat, &client).allowed);
        }
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_purge_expired() {
        let limiter = RateLimiter::default();
        let client = ClientIdentity::new("ip-3");
        limiter.check_and_consume_at(Capability::Chat, &client, ts("2024-05-01T08:00:00Z"));
        assert_eq!(limiter.purge_expired(ts("2024-05-01T20:00:00Z")), 0);
        assert_eq!(limiter.purge_expired(ts("2024-05-02T00:00:00Z")), 1);
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_client_identity_fallback() {
        assert!(ClientIdentity::new("  ").is_anonymous());
        assert_eq!(ClientIdentity::new(" 10.0.0.1 ").as_str(), "10.0.0.1");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consumption_never_exceeds_limit() {
        let limiter = Arc::new(RateLimiter::new(
            RateLimitPolicy::daily().with_limit(Capability::Stt, 15),
        ));
        let client = ClientIdentity::new("ip-1");

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let limiter = limiter.clone();
                let client = client.clone();
                tokio::spawn(
                    async move { limiter.check_and_consume(Capability::Stt, &client).allowed },
                )
            })
            .collect();

        let results = futures::future::join_all(handles).await;
        let allowed = results.into_iter().filter(|r| matches!(r, Ok(true))).count();
        assert_eq!(allowed, 15);
    }
}
