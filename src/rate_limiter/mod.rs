//! Rate limiting subsystem.
//!
//! # Data Flow
//! ```text
//! identity (IP or token)
//!     → store.rs (look up or lazily create the bucket; store lock)
//!     → bucket.rs (refill + take one token; bucket lock)
//!     → allow / deny
//!
//! Transports over the same limiter:
//!     in-process   admission.rs (load balancer)
//!     TCP          server.rs LimiterHandler   "<identity>\n" → "1\n" | "0\n"
//!     HTTP         server.rs http_router      GET /check?ip=<identity> → 200 | 429
//!     TCP client   client.rs RemoteLimiter
//! ```
//!
//! # Design Decisions
//! - Two lock scopes: the store's map, then the bucket. Unrelated clients never
//!   contend on a bucket lock
//! - The refill-and-decide step is one critical section per key
//! - Time is an argument (`check_at`) so every transport yields the same
//!   decision for the same identity/timing sequence

use std::sync::PoisonError;
use std::time::Instant;

pub mod admission;
pub mod bucket;
pub mod client;
pub mod server;
pub mod store;

pub use admission::Admission;
pub use bucket::{BucketPolicy, TokenBucket};
pub use client::{LimiterError, RemoteLimiter};
pub use store::{BucketStore, InMemoryStore};

/// Per-identity token bucket limiter.
#[derive(Debug)]
pub struct RateLimiter<S = InMemoryStore> {
    store: S,
    policy: BucketPolicy,
}

impl RateLimiter<InMemoryStore> {
    /// Limiter backed by the unbounded in-memory store.
    pub fn new(rate: f64, burst: f64) -> Self {
        Self::with_store(InMemoryStore::new(), BucketPolicy::new(rate, burst))
    }
}

impl<S: BucketStore> RateLimiter<S> {
    pub fn with_store(store: S, policy: BucketPolicy) -> Self {
        Self { store, policy }
    }

    /// Admission decision for `identity` right now.
    pub fn check(&self, identity: &str) -> bool {
        self.check_at(identity, Instant::now())
    }

    /// Admission decision for `identity` as of `now`.
    pub fn check_at(&self, identity: &str, now: Instant) -> bool {
        let burst = self.policy.burst;
        let bucket = self
            .store
            .get_or_insert_with(identity, || TokenBucket::new(burst, now));

        let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.try_acquire(self.policy, now)
    }

    pub fn policy(&self) -> BucketPolicy {
        self.policy
    }

    /// Number of identities seen so far.
    pub fn tracked_clients(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn eleventh_immediate_check_is_denied() {
        let limiter = RateLimiter::new(25.0, 10.0);
        let now = Instant::now();

        for _ in 0..10 {
            assert!(limiter.check_at("10.0.0.1", now));
        }
        assert!(!limiter.check_at("10.0.0.1", now));
        assert!(limiter.check_at("10.0.0.1", now + Duration::from_millis(40)));
    }

    #[test]
    fn identities_are_independent() {
        let limiter = RateLimiter::new(1.0, 1.0);
        let now = Instant::now();

        assert!(limiter.check_at("a", now));
        assert!(!limiter.check_at("a", now));
        assert!(limiter.check_at("b", now));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn concurrent_checks_never_double_spend() {
        let limiter = RateLimiter::new(25.0, 10.0);
        let now = Instant::now();
        let allowed = std::sync::atomic::AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..10 {
                        if limiter.check_at("shared", now) {
                            allowed.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(allowed.into_inner(), 10);
    }

    #[test]
    fn real_clock_refills() {
        let limiter = RateLimiter::new(25.0, 10.0);
        for _ in 0..10 {
            assert!(limiter.check("client"));
        }
        assert!(!limiter.check("client"));

        std::thread::sleep(Duration::from_millis(50));
        assert!(limiter.check("client"));
    }
}
