//! TCP client for the standalone rate limiter.

use std::time::Duration;

use thiserror::Error;

use crate::net::{request_line, LineError};
use crate::rate_limiter::server::{ALLOW, DENY};

/// Errors from a remote admission check.
#[derive(Debug, Error)]
pub enum LimiterError {
    #[error("rate limiter unavailable: {0}")]
    Unavailable(#[from] LineError),

    #[error("unexpected rate limiter reply {0:?}")]
    Protocol(String),

    #[error("identity must be a single line")]
    InvalidIdentity,
}

/// Asks a remote limiter over one short TCP exchange per check.
#[derive(Debug, Clone)]
pub struct RemoteLimiter {
    addr: String,
    timeout: Duration,
}

impl RemoteLimiter {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// `Ok(true)` when the limiter admits `identity`.
    pub async fn check(&self, identity: &str) -> Result<bool, LimiterError> {
        if identity.contains(['\n', '\r']) {
            return Err(LimiterError::InvalidIdentity);
        }

        let reply = request_line(&self.addr, identity, self.timeout).await?;
        match reply.trim() {
            ALLOW => Ok(true),
            DENY => Ok(false),
            _ => Err(LimiterError::Protocol(reply)),
        }
    }
}
