//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All services produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than interpolated messages
//! - Request ID flows through the load balancer into backends
//! - Metrics are cheap and disabled unless an exporter address is configured

pub mod logging;
pub mod metrics;
