//! Per-listener connection accounting.
//!
//! Every accepted connection gets a process-unique id for log correlation
//! and counts towards the `net_active_connections` gauge of its service
//! until its guard is dropped.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// Live connection count of one line server.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    service: &'static str,
    active: Arc<AtomicUsize>,
}

impl ConnectionTracker {
    pub fn new(service: &'static str) -> Self {
        Self {
            service,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Account for a freshly accepted connection from `peer`.
    pub fn open(&self, peer: SocketAddr) -> ConnectionGuard {
        let active = self.active.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::record_connection_opened(self.service, active);

        ConnectionGuard {
            id: NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed),
            peer,
            service: self.service,
            active: Arc::clone(&self.active),
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}

/// Held by the task serving one connection.
#[derive(Debug)]
pub struct ConnectionGuard {
    id: u64,
    peer: SocketAddr,
    service: &'static str,
    active: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let remaining = self.active.fetch_sub(1, Ordering::Relaxed) - 1;
        metrics::record_connection_closed(self.service, remaining);
        tracing::debug!(
            service = self.service,
            connection_id = self.id,
            peer_addr = %self.peer,
            active = remaining,
            "Connection closed"
        );
    }
}
