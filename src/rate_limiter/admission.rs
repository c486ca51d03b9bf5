//! Admission control as seen from the load balancer.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{LimiterMode, RateLimiterConfig};
use crate::observability::metrics;
use crate::rate_limiter::{LimiterError, RateLimiter, RemoteLimiter};

/// Which limiter binding the load balancer consults.
#[derive(Debug, Clone)]
pub enum Admission {
    /// Admit everything.
    Disabled,
    /// Buckets live in this process.
    Local(Arc<RateLimiter>),
    /// Ask the standalone limiter over TCP.
    Remote(RemoteLimiter),
}

impl Admission {
    pub fn from_config(mode: LimiterMode, config: &RateLimiterConfig) -> Self {
        match mode {
            LimiterMode::Disabled => Admission::Disabled,
            LimiterMode::Local => {
                Admission::Local(Arc::new(RateLimiter::new(config.rate, config.burst)))
            }
            LimiterMode::Remote => Admission::Remote(RemoteLimiter::new(
                config.address(),
                Duration::from_millis(config.timeout_ms),
            )),
        }
    }

    /// `Ok(true)` to let the request through. An unreachable remote limiter
    /// is an error; the caller refuses the request.
    pub async fn admit(&self, identity: &str) -> Result<bool, LimiterError> {
        match self {
            Admission::Disabled => Ok(true),
            Admission::Local(limiter) => {
                let allowed = limiter.check(identity);
                metrics::record_limiter_decision("local", allowed);
                Ok(allowed)
            }
            Admission::Remote(client) => client.check(identity).await,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Admission::Disabled)
    }
}
