//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment overrides (loader.rs)
//!     → validation.rs (per-service semantic checks)
//!     → AppConfig (validated, immutable)
//!     → handed to the selected service at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the backend pool is fixed for the process lifetime
//! - All fields have defaults so a service only needs the settings it actually uses
//! - Missing required settings are fatal before any listener is bound

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, BrokerConfig, HealthCheckConfig, LimiterMode, LoadBalancerConfig, LogFormat,
    MailConfig, ObservabilityConfig, RateLimiterConfig, WorkerConfig,
};
pub use validation::ValidationError;

/// The long-running services this crate can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    LoadBalancer,
    RateLimiter,
    Broker,
    Worker,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Service::LoadBalancer => "load-balancer",
            Service::RateLimiter => "rate-limiter",
            Service::Broker => "broker",
            Service::Worker => "worker",
        };
        f.write_str(name)
    }
}
