//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request admitted
//!     → pool.rs (fixed list of backends)
//!     → round_robin.rs (rotate through backends, skip dead ones)
//!     → backend.rs (liveness + request counter)
//!     → Return backend or "no server available"
//! ```
//!
//! # Design Decisions
//! - Pool membership is fixed at startup; only liveness changes
//! - Liveness is written by the health loop and read by routing
//! - At most one full sweep per selection

use std::sync::Arc;

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::Backend;
pub use pool::ServerPool;
pub use round_robin::RoundRobin;

/// Strategy that picks the next backend from a pool.
pub trait LoadBalancer: std::fmt::Debug + Send + Sync {
    /// Select a live backend, or `None` if no backend is alive.
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}
