//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{AppConfig, LimiterMode, LogFormat};
use crate::config::validation::{validate_config, ValidationError};
use crate::config::Service;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment variable {key}={value:?}: {reason}")]
    Env {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration for `service`: defaults, then the optional TOML file,
/// then process environment variables, then validation.
pub fn load_config(service: Service, path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(service, &config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment values onto `config`. `lookup` returns the raw value
/// of a variable, if set.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(raw) = get("BACKENDS") {
        config.load_balancer.backends = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(raw) = get("LOAD_BALANCER_PORT") {
        config.load_balancer.port = parse("LOAD_BALANCER_PORT", raw)?;
    }
    if let Some(raw) = get("LIMITER_MODE") {
        config.load_balancer.limiter = parse::<LimiterMode>("LIMITER_MODE", raw)?;
    }

    if let Some(raw) = get("RATE_LIMITER_HOST") {
        config.rate_limiter.host = raw;
    }
    if let Some(raw) = get("RATE_LIMITER_PORT") {
        config.rate_limiter.port = parse("RATE_LIMITER_PORT", raw)?;
    }
    if let Some(raw) = get("RATE_LIMITER_HTTP_PORT") {
        config.rate_limiter.http_port = Some(parse("RATE_LIMITER_HTTP_PORT", raw)?);
    }
    if let Some(raw) = get("RATE_LIMIT_RATE") {
        config.rate_limiter.rate = parse("RATE_LIMIT_RATE", raw)?;
    }
    if let Some(raw) = get("RATE_LIMIT_BURST") {
        config.rate_limiter.burst = parse("RATE_LIMIT_BURST", raw)?;
    }

    if let Some(raw) = get("HEALTH_CHECK_INTERVAL_SECS") {
        config.health_check.interval_secs = parse("HEALTH_CHECK_INTERVAL_SECS", raw)?;
    }
    if let Some(raw) = get("HEALTH_CHECK_PATH") {
        config.health_check.path = raw;
    }

    if let Some(raw) = get("BROKER_HOST") {
        config.broker.host = raw;
    }
    if let Some(raw) = get("BROKER_PORT") {
        config.broker.port = parse("BROKER_PORT", raw)?;
    }
    if let Some(raw) = get("POLL_INTERVAL_MS") {
        config.worker.poll_interval_ms = parse("POLL_INTERVAL_MS", raw)?;
    }

    if let Some(raw) = get("SMTP_HOST") {
        config.mail.host = Some(raw);
    }
    if let Some(raw) = get("SMTP_PORT") {
        config.mail.port = parse("SMTP_PORT", raw)?;
    }
    if let Some(raw) = get("SMTP_USER") {
        config.mail.username = Some(raw);
    }
    if let Some(raw) = get("SMTP_PASSWORD") {
        config.mail.password = Some(raw);
    }
    if let Some(raw) = get("SMTP_FROM") {
        config.mail.from = Some(raw);
    }

    if let Some(raw) = get("LOG_FORMAT") {
        config.observability.log_format = match raw.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" | "text" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::Env {
                    key: "LOG_FORMAT",
                    value: raw,
                    reason: "expected 'pretty' or 'json'".into(),
                })
            }
        };
    }
    if let Some(raw) = get("METRICS_ADDRESS") {
        config.observability.metrics_address = Some(raw);
    }

    Ok(())
}

fn parse<T>(key: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Env {
        key,
        reason: e.to_string(),
        value: raw,
    })
}
