//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection (broker, rate limiter)
//!     → line.rs (accept loop, one task per connection, lines capped at 64 KiB)
//!     → connection.rs (connection id, per-service active gauge)
//!     → LineHandler (one reply line per request line)
//!
//! Outgoing exchange (worker, load balancer, CLI)
//!     → line.rs request_line (connect, send, read one line, bounded by a timeout)
//! ```
//!
//! # Design Decisions
//! - Handlers are synchronous; no I/O happens while service state is locked
//! - Each connection is independent; a broken client only ends its own task

pub mod connection;
pub mod line;

pub use connection::{ConnectionGuard, ConnectionTracker};
pub use line::{request_line, serve_lines, LineError, LineHandler, MAX_LINE_LENGTH};
