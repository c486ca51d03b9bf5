//! Backend pool management.
//!
//! # Responsibilities
//! - Own the fixed list of backends built from configuration
//! - Apply the load balancing algorithm to select a live backend
//! - Expose every backend to the health check loop

use std::sync::Arc;

use crate::load_balancer::{backend::Backend, round_robin::RoundRobin, LoadBalancer};

/// The ordered, fixed-size set of backends plus the selection strategy.
#[derive(Debug)]
pub struct ServerPool {
    backends: Vec<Arc<Backend>>,
    balancer: Box<dyn LoadBalancer>,
}

impl ServerPool {
    /// Build a round-robin pool from configured addresses.
    pub fn new(addresses: &[String]) -> Result<Self, String> {
        let backends = addresses
            .iter()
            .map(|addr| Backend::new(addr).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::with_balancer(backends, Box::new(RoundRobin::new())))
    }

    /// Build a pool over existing backends with a specific strategy.
    pub fn with_balancer(backends: Vec<Arc<Backend>>, balancer: Box<dyn LoadBalancer>) -> Self {
        Self { backends, balancer }
    }

    /// Select a live backend, or `None` if the whole pool is dead.
    pub fn next(&self) -> Option<Arc<Backend>> {
        let selected = self.balancer.next_server(&self.backends);
        if selected.is_none() {
            tracing::debug!(backend_count = self.backends.len(), "No live backends in pool");
            for b in &self.backends {
                tracing::debug!(addr = %b.addr, alive = b.is_alive(), "Backend status");
            }
        }
        selected
    }

    /// Return all backends (for health checking).
    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    /// Number of backends in the pool.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Number of backends currently marked alive.
    pub fn alive_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_alive()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_addresses() {
        let pool = ServerPool::new(&[
            "http://localhost:8081".to_string(),
            "127.0.0.1:8082".to_string(),
        ])
        .unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.alive_count(), 2);
    }

    #[test]
    fn invalid_address_fails_construction() {
        assert!(ServerPool::new(&["https://nope:1".to_string()]).is_err());
    }

    #[test]
    fn next_skips_dead_and_reports_exhaustion() {
        let pool = ServerPool::new(&["127.0.0.1:1".to_string(), "127.0.0.1:2".to_string()]).unwrap();
        pool.all_backends()[0].set_alive(false);
        assert_eq!(pool.next().unwrap().addr, "127.0.0.1:2");
        assert_eq!(pool.next().unwrap().addr, "127.0.0.1:2");

        pool.all_backends()[1].set_alive(false);
        assert!(pool.next().is_none());
        assert_eq!(pool.alive_count(), 0);
    }
}
