//! Token bucket arithmetic.

use std::time::Instant;

/// Refill rate and capacity shared by every bucket of a limiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketPolicy {
    /// Tokens added per second.
    pub rate: f64,
    /// Maximum tokens a bucket holds.
    pub burst: f64,
}

impl BucketPolicy {
    pub fn new(rate: f64, burst: f64) -> Self {
        Self { rate, burst }
    }
}

/// A simple token bucket rate limiter.
///
/// Invariant: `0 <= tokens <= burst` after every call.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A full bucket observed first at `now`.
    pub fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Refill for the time elapsed since the last call, then take one token
    /// if available.
    pub fn try_acquire(&mut self, policy: BucketPolicy, now: Instant) -> bool {
        // saturates to zero if `now` predates the last refill
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * policy.rate).min(policy.burst);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently held, as of the last call.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }
}
