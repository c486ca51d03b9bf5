//! Traffic control plane: a round-robin load balancer with health checks,
//! a token-bucket rate limiter, and a line-based message broker drained by
//! a notification worker.

pub mod broker;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;
pub mod rate_limiter;
pub mod worker;

pub use config::{AppConfig, Service};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
