//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure shared by the
//! four services. All types derive Serde traits for deserialization from
//! config files; environment overrides are applied on top by the loader.

use serde::{Deserialize, Serialize};

/// Root configuration for every service in the plane.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Load balancer listener and backend pool.
    pub load_balancer: LoadBalancerConfig,

    /// Health check settings for the backend pool.
    pub health_check: HealthCheckConfig,

    /// Token bucket parameters and limiter listeners.
    pub rate_limiter: RateLimiterConfig,

    /// Message broker listener.
    pub broker: BrokerConfig,

    /// Queue consumer settings.
    pub worker: WorkerConfig,

    /// Outbound mail transport credentials.
    pub mail: MailConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Where the load balancer gets admission decisions from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LimiterMode {
    /// Every request is admitted.
    #[default]
    Disabled,
    /// Token buckets live inside the load balancer process.
    Local,
    /// Each request is checked against the standalone limiter over TCP.
    Remote,
}

impl std::str::FromStr for LimiterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(LimiterMode::Disabled),
            "local" => Ok(LimiterMode::Local),
            "remote" => Ok(LimiterMode::Remote),
            other => Err(format!("unknown limiter mode '{}'", other)),
        }
    }
}

/// Load balancer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadBalancerConfig {
    /// Interface to bind.
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Backend addresses, e.g. "http://localhost:8081" or "127.0.0.1:8081".
    pub backends: Vec<String>,

    /// Admission control binding.
    pub limiter: LimiterMode,

    /// Total time allowed for a proxied request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            backends: Vec::new(),
            limiter: LimiterMode::Disabled,
            request_timeout_secs: 30,
        }
    }
}

impl LoadBalancerConfig {
    /// Socket address string to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health check timeout in seconds.
    pub timeout_secs: u64,

    /// Unauthenticated path to probe on each backend.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_secs: 5,
            path: "/health".to_string(),
        }
    }
}

/// Rate limiter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Host the limiter binds on, and the host remote clients dial.
    pub host: String,

    /// TCP line protocol port.
    pub port: u16,

    /// Optional HTTP port for the `/check` variant.
    pub http_port: Option<u16>,

    /// Refill rate in tokens per second.
    pub rate: f64,

    /// Bucket capacity.
    pub burst: f64,

    /// Deadline for one remote check round trip, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            http_port: None,
            rate: 25.0,
            burst: 10.0,
            timeout_ms: 500,
        }
    }
}

impl RateLimiterConfig {
    /// Address of the TCP listener.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Address of the HTTP listener, if enabled.
    pub fn http_address(&self) -> Option<String> {
        self.http_port.map(|port| format!("{}:{}", self.host, port))
    }
}

/// Broker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Host the broker binds on, and the host clients dial.
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Deadline for one client round trip, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9005,
            timeout_ms: 2000,
        }
    }
}

impl BrokerConfig {
    /// Address of the broker listener.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Delay between two POP cycles, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

/// SMTP relay configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MailConfig {
    /// SMTP relay host (STARTTLS).
    pub host: Option<String>,

    /// SMTP relay port.
    pub port: u16,

    /// Account name. Doubles as the sender address when `from` is unset.
    pub username: Option<String>,

    /// Sender mailbox, e.g. `Service <noreply@example.com>`.
    pub from: Option<String>,

    /// Account secret.
    pub password: Option<String>,

    /// Deadline for one send, in seconds.
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 587,
            username: None,
            from: None,
            password: None,
            timeout_secs: 10,
        }
    }
}

// Keeps the secret out of logs.
impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("from", &self.from)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Prometheus exporter bind address; the exporter is off when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "traffic_control=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.load_balancer.port, 8080);
        assert_eq!(config.rate_limiter.rate, 25.0);
        assert_eq!(config.rate_limiter.burst, 10.0);
        assert_eq!(config.broker.port, 9005);
        assert_eq!(config.worker.poll_interval_ms, 1000);
        assert_eq!(config.health_check.interval_secs, 10);
        assert_eq!(config.load_balancer.limiter, LimiterMode::Disabled);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [load_balancer]
            backends = ["http://localhost:8081"]
            limiter = "remote"

            [rate_limiter]
            burst = 5.0
            "#,
        )
        .unwrap();

        assert_eq!(config.load_balancer.backends.len(), 1);
        assert_eq!(config.load_balancer.limiter, LimiterMode::Remote);
        assert_eq!(config.load_balancer.port, 8080);
        assert_eq!(config.rate_limiter.burst, 5.0);
        assert_eq!(config.rate_limiter.rate, 25.0);
    }

    #[test]
    fn mail_debug_redacts_password() {
        let mail = MailConfig {
            password: Some("hunter2".into()),
            ..MailConfig::default()
        };
        let rendered = format!("{:?}", mail);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
