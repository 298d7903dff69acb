// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Rate-limited logging gate for high-frequency call sites (e.g. per-packet trace events).
//!
//! Mirrors the role of the original datapath's `vlog_rate_limit`: a call site that fires once
//! per packet must not be allowed to flood the log sink. [`RateLimiter`] tracks a token bucket
//! per instance; construct one `static` per call site and guard the log statement with
//! [`RateLimiter::allow`].

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A simple token-bucket rate limiter, safe to share as a `static` across threads.
#[derive(Debug)]
pub struct RateLimiter {
    burst: u32,
    period: Duration,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    tokens: u32,
    last_refill: Option<Instant>,
    suppressed: u64,
}

impl RateLimiter {
    /// Create a limiter allowing up to `burst` events per `period`, refilling continuously.
    #[must_use]
    pub const fn new(burst: u32, period: Duration) -> Self {
        Self {
            burst,
            period,
            state: Mutex::new(State {
                tokens: burst,
                last_refill: None,
                suppressed: 0,
            }),
        }
    }

    /// Returns `true` if the caller should log now, `false` if this event should be dropped.
    /// When an event is suppressed the count of suppressed events since the last allowed one is
    /// tracked and returned on the next `true`, so callers can log "(N events suppressed)".
    pub fn allow(&self) -> RateDecision {
        let Ok(mut state) = self.state.lock() else {
            return RateDecision::Allow { suppressed_since_last: 0 };
        };
        let now = Instant::now();
        if let Some(last) = state.last_refill {
            let elapsed = now.duration_since(last);
            if elapsed >= self.period {
                state.tokens = self.burst;
                state.last_refill = Some(now);
            }
        } else {
            state.last_refill = Some(now);
        }

        if state.tokens > 0 {
            state.tokens -= 1;
            let suppressed = std::mem::take(&mut state.suppressed);
            RateDecision::Allow { suppressed_since_last: suppressed }
        } else {
            state.suppressed += 1;
            RateDecision::Suppress
        }
    }
}

/// The outcome of a [`RateLimiter::allow`] check.
#[derive(Debug, Clone, Copy)]
pub enum RateDecision {
    /// Log this event. `suppressed_since_last` counts events dropped since the previous `Allow`.
    Allow {
        /// Number of events suppressed between this allowed event and the previous one.
        suppressed_since_last: u64,
    },
    /// Drop this event; the bucket is empty.
    Suppress,
}

impl RateDecision {
    /// Convenience for call sites that only care whether to log, not the suppressed count.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, RateDecision::Allow { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_suppress() {
        let rl = RateLimiter::new(2, Duration::from_secs(60));
        assert!(rl.allow().is_allow());
        assert!(rl.allow().is_allow());
        assert!(!rl.allow().is_allow());
        assert!(!rl.allow().is_allow());
    }

    #[test]
    fn reports_suppressed_count() {
        let rl = RateLimiter::new(1, Duration::from_millis(10));
        assert!(rl.allow().is_allow());
        assert!(!rl.allow().is_allow());
        assert!(!rl.allow().is_allow());
        std::thread::sleep(Duration::from_millis(20));
        match rl.allow() {
            RateDecision::Allow { suppressed_since_last } => assert_eq!(suppressed_since_last, 2),
            RateDecision::Suppress => panic!("expected refill to allow"),
        }
    }
}
