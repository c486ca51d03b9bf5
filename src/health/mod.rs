//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → GET <path> on each backend (bounded by a timeout)
//!     → 2xx ⇒ alive, anything else ⇒ dead
//!     → Backend liveness flag
//! ```
//!
//! # Design Decisions
//! - Runs beside request handling and never blocks it
//! - Communicates with routing only through the liveness flags
//! - Probe failures are logged, never escalated

pub mod active;

pub use active::HealthMonitor;
