//! Rate limiting for wallet login flows.
//!
//! Challenge expiry already bounds how long a stolen challenge is useful, but
//! it does not bound how many signatures an attacker can try against it. The
//! sliding-window limiter closes that gap per address and per IP.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
const DEFAULT_MAX_ATTEMPTS: usize = 10;
const MAX_TRACKED_KEYS: usize = 10_000;

#[derive(Clone, Copy, Debug)]
pub enum RateLimitAction {
    Challenge,
    Login,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
    fn check_address(&self, address: &str, action: RateLimitAction) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }

    fn check_address(&self, _address: &str, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// In-process sliding window over `(key, action)` pairs.
///
/// Counts are per instance; multi-instance deployments that need a shared
/// budget can implement `RateLimiter` over the database instead.
#[derive(Debug)]
pub struct SlidingWindowRateLimiter {
    window: Duration,
    max_attempts: usize,
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
}

impl SlidingWindowRateLimiter {
    #[must_use]
    pub fn new(window: Duration, max_attempts: usize) -> Self {
        Self {
            window,
            max_attempts,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    fn check(&self, key: String) -> RateLimitDecision {
        let now = Instant::now();
        let Ok(mut attempts) = self.attempts.lock() else {
            // Poisoned lock: fail open rather than deny all logins.
            return RateLimitDecision::Allowed;
        };
        // Evict keys whose window has fully passed; attacker-chosen keys
        // (garbage addresses included) must not grow the map without bound.
        attempts.retain(|_, entry| {
            entry.retain(|at| now.duration_since(*at) < self.window);
            !entry.is_empty()
        });
        if attempts.len() >= MAX_TRACKED_KEYS && !attempts.contains_key(&key) {
            // Hard cap on distinct live keys; fail open for new ones so the
            // tracker itself cannot be turned into a denial of service.
            return RateLimitDecision::Allowed;
        }
        let entry = attempts.entry(key).or_default();
        if entry.len() >= self.max_attempts {
            return RateLimitDecision::Limited;
        }
        entry.push(now);
        RateLimitDecision::Allowed
    }
}

impl Default for SlidingWindowRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_ATTEMPTS)
    }
}

impl RateLimiter for SlidingWindowRateLimiter {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        // Requests without a resolvable client IP are not pooled together.
        let Some(ip) = ip else {
            return RateLimitDecision::Allowed;
        };
        self.check(format!("ip:{ip}:{action:?}"))
    }

    fn check_address(&self, address: &str, action: RateLimitAction) -> RateLimitDecision {
        self.check(format!("address:{address}:{action:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::Challenge),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_address("0xabc", RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn sliding_window_limits_after_max_attempts() {
        let limiter = SlidingWindowRateLimiter::new(Duration::from_secs(60), 3);
        for _ in 0..3 {
            assert_eq!(
                limiter.check_address("0xabc", RateLimitAction::Login),
                RateLimitDecision::Allowed
            );
        }
        assert_eq!(
            limiter.check_address("0xabc", RateLimitAction::Login),
            RateLimitDecision::Limited
        );
        // A different address has its own budget.
        assert_eq!(
            limiter.check_address("0xdef", RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn window_expiry_frees_the_budget() {
        let limiter = SlidingWindowRateLimiter::new(Duration::from_millis(20), 1);
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
            RateLimitDecision::Limited
        );
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn stale_keys_are_evicted() {
        let limiter = SlidingWindowRateLimiter::new(Duration::from_millis(10), 3);
        for i in 0..50 {
            limiter.check_address(&format!("0xjunk{i}"), RateLimitAction::Login);
        }
        std::thread::sleep(Duration::from_millis(20));
        // Any later check sweeps the expired windows out of the map.
        limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login);
        assert_eq!(limiter.attempts.lock().expect("lock").len(), 1);
    }

    #[test]
    fn tracked_keys_are_capped() {
        let limiter = SlidingWindowRateLimiter::new(Duration::from_secs(60), 3);
        for i in 0..(MAX_TRACKED_KEYS + 10) {
            assert_eq!(
                limiter.check_address(&format!("0xgarbage{i}"), RateLimitAction::Login),
                RateLimitDecision::Allowed
            );
        }
        assert_eq!(
            limiter.attempts.lock().expect("lock").len(),
            MAX_TRACKED_KEYS
        );
        // Keys already tracked keep their own budget even at the cap.
        for _ in 0..2 {
            limiter.check_address("0xgarbage0", RateLimitAction::Login);
        }
        assert_eq!(
            limiter.check_address("0xgarbage0", RateLimitAction::Login),
            RateLimitDecision::Limited
        );
    }

    #[test]
    fn missing_ip_is_not_limited() {
        let limiter = SlidingWindowRateLimiter::new(Duration::from_secs(60), 1);
        for _ in 0..5 {
            assert_eq!(
                limiter.check_ip(None, RateLimitAction::Login),
                RateLimitDecision::Allowed
            );
        }
    }
}
