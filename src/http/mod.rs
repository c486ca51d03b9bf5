//! HTTP front of the load balancer.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing, timeout)
//!     → admission check (rate limiter, optional)
//!     → ServerPool::next (round robin over live backends)
//!     → request.rs (rewrite URI, strip hop-by-hop, X-Forwarded-For)
//!     → backend
//!     → response.rs (stream status, headers, body back)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{client_identity, TOKEN_HEADER, X_FORWARDED_FOR, X_REQUEST_ID};
pub use server::HttpServer;
