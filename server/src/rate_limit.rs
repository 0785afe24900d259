use axum::http::HeaderMap;
use dashmap::DashMap;
use std::net::SocketAddr;

/// Failed attempts allowed per client address before rejection.
pub const MAX_FAILURES: u32 = 5;

/// The whole map is dropped on this cadence: a coarse global reset, not a
/// per-key sliding window.
pub const SWEEP_INTERVAL_SECS: u64 = 3600;

/// Credential-attempt limiter keyed by client address.
///
/// Counts failures only: a request is rejected once its key has reached
/// `MAX_FAILURES`, before the store is ever consulted. Success clears the
/// key; the hourly sweep clears everything. Process-local and not durable.
#[derive(Default)]
pub struct RateLimiter {
    failures: DashMap<String, u32>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an attempt from this key may proceed.
    pub fn check(&self, key: &str) -> bool {
        self.failures.get(key).map(|n| *n < MAX_FAILURES).unwrap_or(true)
    }

    pub fn record_failure(&self, key: &str) {
        *self.failures.entry(key.to_string()).or_insert(0) += 1;
    }

    pub fn record_success(&self, key: &str) {
        self.failures.remove(key);
    }

    /// Drop every counter (called from the hourly background task).
    pub fn sweep(&self) {
        self.failures.clear();
    }
}

/// Limiter keys are prefixed by concern so the one service covers both
/// credential paths.
pub fn login_key(addr: &str) -> String {
    format!("login:{addr}")
}

pub fn pin_key(addr: &str) -> String {
    format!("pin:{addr}")
}

/// Resolve the client address for limiter keying. Forwarding headers win over
/// the socket address so deployments behind a reverse proxy key on the real
/// client. The address is possibly spoofable; the limiter is deliberately
/// approximate.
pub fn client_addr(headers: &HeaderMap, addr: &SocketAddr) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }
    addr.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sixth_attempt_is_blocked() {
        let limiter = RateLimiter::new();
        let key = login_key("10.0.0.1");
        for _ in 0..MAX_FAILURES {
            assert!(limiter.check(&key));
            limiter.record_failure(&key);
        }
        // Even a correct password never reaches the store now.
        assert!(!limiter.check(&key));
    }

    #[test]
    fn test_success_clears_counter() {
        let limiter = RateLimiter::new();
        let key = login_key("10.0.0.2");
        for _ in 0..MAX_FAILURES {
            limiter.record_failure(&key);
        }
        assert!(!limiter.check(&key));
        limiter.record_success(&key);
        assert!(limiter.check(&key));
    }

    #[test]
    fn test_sweep_resets_everything() {
        let limiter = RateLimiter::new();
        limiter.record_failure(&login_key("10.0.0.3"));
        limiter.record_failure(&pin_key("10.0.0.4"));
        limiter.sweep();
        assert!(limiter.check(&login_key("10.0.0.3")));
        assert!(limiter.check(&pin_key("10.0.0.4")));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new();
        for _ in 0..MAX_FAILURES {
            limiter.record_failure(&login_key("10.0.0.5"));
        }
        assert!(!limiter.check(&login_key("10.0.0.5")));
        // The PIN path and other addresses are unaffected.
        assert!(limiter.check(&pin_key("10.0.0.5")));
        assert!(limiter.check(&login_key("10.0.0.6")));
    }

    #[test]
    fn test_forwarded_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        let addr = "127.0.0.1:9999".parse::<SocketAddr>().unwrap();
        assert_eq!(client_addr(&headers, &addr), "203.0.113.7");

        let empty = HeaderMap::new();
        assert_eq!(client_addr(&empty, &addr), "127.0.0.1");
    }
}
