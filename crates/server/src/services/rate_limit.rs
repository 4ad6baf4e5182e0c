//! Fixed-window rate limiting keyed by client address.
//!
//! An injectable service rather than module-level state: the server holds
//! one instance for login attempts and one for order submission, both living
//! in [`crate::state::AppState`]. Counters are process-local, so under
//! horizontal scale-out each instance independently limits its own slice of
//! traffic - acceptable for a single logical deployment, documented as a
//! known weakening otherwise.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Rejected; retry after roughly this many seconds.
    Limited { retry_after_secs: u64 },
}

#[derive(Debug)]
struct AttemptWindow {
    count: u32,
    started: Instant,
}

/// Sliding-window attempt counter per client address.
#[derive(Debug)]
pub struct RateLimiter {
    max_attempts: u32,
    window: Duration,
    entries: Mutex<HashMap<IpAddr, AttemptWindow>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_attempts` per `window` per key.
    #[must_use]
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt for `key` and decide whether it is admitted.
    ///
    /// A key with no record, or whose window has elapsed, restarts at a
    /// count of one and is allowed.
    pub fn check(&self, key: IpAddr) -> RateDecision {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let entry = entries.entry(key).or_insert(AttemptWindow {
            count: 0,
            started: now,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.count = 1;
            entry.started = now;
            return RateDecision::Allowed;
        }

        entry.count = entry.count.saturating_add(1);
        if entry.count > self.max_attempts {
            let elapsed = now.duration_since(entry.started);
            let retry_after = self.window.saturating_sub(elapsed);
            return RateDecision::Limited {
                retry_after_secs: retry_after.as_secs().max(1),
            };
        }

        RateDecision::Allowed
    }

    /// Clear a key's record.
    ///
    /// Called after a successful login so a legitimate user who fumbled
    /// their password is not punished on the next attempt.
    pub fn reset(&self, key: IpAddr) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(203, 0, 113, 7));
    const OTHER: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(203, 0, 113, 8));

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert_eq!(limiter.check(KEY), RateDecision::Allowed);
        }
        assert!(matches!(
            limiter.check(KEY),
            RateDecision::Limited { retry_after_secs } if retry_after_secs >= 1
        ));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert_eq!(limiter.check(KEY), RateDecision::Allowed);
        assert!(matches!(limiter.check(KEY), RateDecision::Limited { .. }));
        assert_eq!(limiter.check(OTHER), RateDecision::Allowed);
    }

    #[test]
    fn window_elapse_restarts_the_counter() {
        let limiter = RateLimiter::new(2, Duration::from_millis(30));
        assert_eq!(limiter.check(KEY), RateDecision::Allowed);
        assert_eq!(limiter.check(KEY), RateDecision::Allowed);
        assert!(matches!(limiter.check(KEY), RateDecision::Limited { .. }));

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(limiter.check(KEY), RateDecision::Allowed);
    }

    #[test]
    fn reset_clears_the_record() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert_eq!(limiter.check(KEY), RateDecision::Allowed);
        assert!(matches!(limiter.check(KEY), RateDecision::Limited { .. }));

        limiter.reset(KEY);
        assert_eq!(limiter.check(KEY), RateDecision::Allowed);
    }
}
