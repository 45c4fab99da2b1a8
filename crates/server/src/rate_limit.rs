//! Rate-limit plumbing at the HTTP boundary
//!
//! Client identity from proxy headers, the `X-RateLimit-*` response headers
//! and periodic purging of ended windows.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, HeaderName, HeaderValue},
};
use chrono::{SecondsFormat, Utc};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use chat_gateway_core::{Capability, ClientIdentity, RateLimitDecision, RateLimiter};

use crate::state::AppState;

pub const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Resolve the caller's identity
///
/// First `X-Forwarded-For` entry, then `X-Real-IP`, else the shared
/// anonymous identity. Proxy headers are ignored when not trusted.
pub fn client_identity(headers: &HeaderMap, trust_forwarded: bool) -> ClientIdentity {
    if !trust_forwarded {
        return ClientIdentity::anonymous();
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .map(ClientIdentity::new)
        .unwrap_or_else(ClientIdentity::anonymous)
}

/// Extractor for the caller's identity
#[derive(Debug, Clone)]
pub struct ClientId(pub ClientIdentity);

#[async_trait]
impl FromRequestParts<AppState> for ClientId {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let trust = state.get_config().server.trust_forwarded_headers;
        Ok(ClientId(client_identity(&parts.headers, trust)))
    }
}

/// `X-RateLimit-{Limit,Remaining,Reset}` for a decision
///
/// Reset is the window end in epoch milliseconds.
pub fn quota_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(3);
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(decision.reset_epoch_millis()));
    headers
}

pub fn reset_at_rfc3339(decision: &RateLimitDecision) -> String {
    decision.reset_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Message returned with a 429
pub fn limit_message(capability: Capability, limit: u32) -> String {
    match capability {
        Capability::Chat => format!("Daily limit reached. You can chat {} times per day.", limit),
        Capability::Translate => {
            format!("Daily limit reached. You can translate {} times per day.", limit)
        }
        Capability::Stt => format!("Daily limit reached. You can use STT {} times per day.", limit),
        Capability::Tts => format!("Daily limit reached. You can use TTS {} times per day.", limit),
        Capability::Vision => {
            format!("Daily limit reached. You can use Vision {} times per day.", limit)
        }
    }
}

/// Periodically drop rate-limit records whose window has ended
pub fn spawn_purge_task(limiter: Arc<RateLimiter>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let purged = limiter.purge_expired(Utc::now());
            if purged > 0 {
                tracing::debug!(
                    purged,
                    remaining = limiter.tracked_keys(),
                    "Purged rate-limit windows"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_forwarded_for_first_entry() {
        let h = headers(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "10.0.0.2"),
        ]);
        assert_eq!(client_identity(&h, true).as_str(), "203.0.113.7");
    }

    #[test]
    fn test_real_ip_fallback() {
        let h = headers(&[("x-real-ip", "198.51.100.4")]);
        assert_eq!(client_identity(&h, true).as_str(), "198.51.100.4");

        let h = headers(&[("x-forwarded-for", " "), ("x-real-ip", "198.51.100.4")]);
        assert_eq!(client_identity(&h, true).as_str(), "198.51.100.4");
    }

    #[test]
    fn test_anonymous_without_hints() {
        assert!(client_identity(&HeaderMap::new(), true).is_anonymous());

        let h = headers(&[("x-forwarded-for", "203.0.113.7")]);
        assert!(client_identity(&h, false).is_anonymous());
    }

    #[test]
    fn test_quota_headers() {
        let limiter = RateLimiter::default();
        let decision = limiter.check_and_consume(Capability::Tts, &ClientIdentity::new("ip-1"));
        let h = quota_headers(&decision);

        assert_eq!(h[LIMIT_HEADER].to_str().unwrap(), "15");
        assert_eq!(h[REMAINING_HEADER].to_str().unwrap(), "14");
        assert_eq!(
            h[RESET_HEADER].to_str().unwrap(),
            decision.reset_epoch_millis().to_string()
        );
        assert!(reset_at_rfc3339(&decision).ends_with('Z'));
    }

    #[test]
    fn test_limit_messages() {
        assert_eq!(
            limit_message(Capability::Translate, 20),
            "Daily limit reached. You can translate 20 times per day."
        );
        assert_eq!(
            limit_message(Capability::Stt, 15),
            "Daily limit reached. You can use STT 15 times per day."
        );
    }
}
