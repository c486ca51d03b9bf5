//! Broker client used by producers (signup path, CLI) and the worker.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::broker::protocol::{Reply, POP};
use crate::net::{request_line, LineError, MAX_LINE_LENGTH};

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(#[from] LineError),

    #[error("payload must be a single non-empty line")]
    InvalidPayload,

    #[error("payload of {0} bytes exceeds the {MAX_LINE_LENGTH} byte line limit")]
    PayloadTooLarge(usize),

    #[error("payload {0:?} collides with a protocol keyword")]
    ReservedPayload(String),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("unexpected broker reply {0:?}")]
    Protocol(String),
}

/// One connection per operation, each bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    addr: String,
    timeout: Duration,
}

impl BrokerClient {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Enqueue a raw payload.
    pub async fn push(&self, payload: &str) -> Result<(), BrokerError> {
        if payload.is_empty() || payload.contains(['\n', '\r']) {
            return Err(BrokerError::InvalidPayload);
        }
        if payload.len() > MAX_LINE_LENGTH {
            return Err(BrokerError::PayloadTooLarge(payload.len()));
        }
        if matches!(Reply::parse(payload), Reply::Ack | Reply::Empty) || payload == POP {
            return Err(BrokerError::ReservedPayload(payload.to_string()));
        }

        let reply = request_line(&self.addr, payload, self.timeout).await?;
        match Reply::parse(&reply) {
            Reply::Ack => Ok(()),
            _ => Err(BrokerError::Protocol(reply)),
        }
    }

    /// Serialize `event` as compact JSON and enqueue it. This is the
    /// fire-and-forget hook a producer calls after a successful signup.
    pub async fn publish<T: Serialize>(&self, event: &T) -> Result<(), BrokerError> {
        let payload = serde_json::to_string(event)?;
        self.push(&payload).await
    }

    /// Dequeue the oldest payload, `None` when the queue is empty.
    pub async fn pop(&self) -> Result<Option<String>, BrokerError> {
        let reply = request_line(&self.addr, POP, self.timeout).await?;
        match Reply::parse(&reply) {
            Reply::Message(payload) => Ok(Some(payload)),
            Reply::Empty => Ok(None),
            Reply::Ack => Err(BrokerError::Protocol(reply)),
        }
    }
}
