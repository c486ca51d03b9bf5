//! Queue consumer.
//!
//! # Data Flow
//! ```text
//! every poll interval:
//!     BrokerClient::pop
//!         → EMPTY: nothing to do
//!         → payload: SignupEvent::decode → Notifier::notify
//! ```
//!
//! # Design Decisions
//! - One outstanding POP/process cycle per worker; run more workers to scale
//! - Malformed payloads and failed sends are logged and dropped, never retried
//! - An unreachable broker is retried on the next tick

use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time;

use crate::broker::{BrokerClient, BrokerError};
use crate::observability::metrics;

pub mod event;
pub mod notifier;

pub use event::SignupEvent;
pub use notifier::{Notifier, NotifyError, SmtpNotifier};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("malformed payload {payload:?}: {source}")]
    Malformed {
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("notification to {email} failed: {source}")]
    Notify {
        email: String,
        #[source]
        source: NotifyError,
    },
}

/// Result of one successful poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The queue was empty.
    Idle,
    /// An event was popped and its notification sent.
    Delivered(SignupEvent),
}

pub struct Worker<N: Notifier> {
    broker: BrokerClient,
    notifier: N,
    poll_interval: Duration,
}

impl<N: Notifier> Worker<N> {
    pub fn new(broker: BrokerClient, notifier: N, poll_interval: Duration) -> Self {
        Self {
            broker,
            notifier,
            poll_interval,
        }
    }

    /// Poll until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            broker = %self.broker.addr(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Worker starting"
        );

        loop {
            match self.poll_once().await {
                Ok(PollOutcome::Idle) => {}
                Ok(PollOutcome::Delivered(event)) => {
                    tracing::info!(email = %event.email, name = %event.name, "Welcome email sent");
                }
                Err(WorkerError::Broker(e)) => {
                    tracing::warn!(error = %e, "Broker poll failed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Message dropped");
                }
            }

            tokio::select! {
                _ = time::sleep(self.poll_interval) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Worker received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One POP/process cycle. A popped message is consumed whatever happens
    /// after the pop.
    pub async fn poll_once(&self) -> Result<PollOutcome, WorkerError> {
        let Some(payload) = self.broker.pop().await? else {
            return Ok(PollOutcome::Idle);
        };

        let event = match SignupEvent::decode(&payload) {
            Ok(event) => event,
            Err(source) => {
                metrics::record_notification("malformed");
                return Err(WorkerError::Malformed { payload, source });
            }
        };

        tracing::debug!(email = %event.email, "Worker: sending email");
        match self.notifier.notify(&event).await {
            Ok(()) => {
                metrics::record_notification("sent");
                Ok(PollOutcome::Delivered(event))
            }
            Err(source) => {
                metrics::record_notification("failed");
                Err(WorkerError::Notify {
                    email: event.email,
                    source,
                })
            }
        }
    }
}
