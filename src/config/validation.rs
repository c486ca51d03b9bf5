//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that each service has the settings it cannot start without
//! - Validate value ranges (rates > 0, intervals > 0, backend URLs)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: (Service, AppConfig) → Result<(), Vec<ValidationError>>
//! - Runs before any listener is bound

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::Service;
use crate::load_balancer::backend::parse_backend_url;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A setting the selected service needs is absent.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A setting is present but unusable.
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Validate the settings `service` depends on.
pub fn validate_config(service: Service, config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match service {
        Service::LoadBalancer => {
            validate_load_balancer(config, &mut errors);
            match config.load_balancer.limiter {
                crate::config::LimiterMode::Local => validate_bucket(config, &mut errors),
                crate::config::LimiterMode::Remote => {
                    if config.rate_limiter.timeout_ms == 0 {
                        errors.push(invalid("rate_limiter.timeout_ms", "must be greater than 0"));
                    }
                }
                crate::config::LimiterMode::Disabled => {}
            }
        }
        Service::RateLimiter => validate_bucket(config, &mut errors),
        Service::Broker => {}
        Service::Worker => validate_worker(config, &mut errors),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_load_balancer(config: &AppConfig, errors: &mut Vec<ValidationError>) {
    let lb = &config.load_balancer;
    if lb.backends.is_empty() {
        errors.push(ValidationError::Missing("BACKENDS"));
    }
    for backend in &lb.backends {
        if let Err(reason) = parse_backend_url(backend) {
            errors.push(invalid("load_balancer.backends", reason));
        }
    }
    if lb.request_timeout_secs == 0 {
        errors.push(invalid("load_balancer.request_timeout_secs", "must be greater than 0"));
    }

    let health = &config.health_check;
    if health.enabled {
        if health.interval_secs == 0 {
            errors.push(invalid("HEALTH_CHECK_INTERVAL_SECS", "must be greater than 0"));
        }
        if health.timeout_secs == 0 {
            errors.push(invalid("health_check.timeout_secs", "must be greater than 0"));
        }
        if !health.path.starts_with('/') {
            errors.push(invalid("HEALTH_CHECK_PATH", "must start with '/'"));
        }
    }
}

fn validate_bucket(config: &AppConfig, errors: &mut Vec<ValidationError>) {
    let limiter = &config.rate_limiter;
    if !(limiter.rate.is_finite() && limiter.rate > 0.0) {
        errors.push(invalid("RATE_LIMIT_RATE", "must be a positive number"));
    }
    if !(limiter.burst.is_finite() && limiter.burst >= 1.0) {
        errors.push(invalid("RATE_LIMIT_BURST", "must be at least 1"));
    }
}

fn validate_worker(config: &AppConfig, errors: &mut Vec<ValidationError>) {
    if config.worker.poll_interval_ms == 0 {
        errors.push(invalid("POLL_INTERVAL_MS", "must be greater than 0"));
    }
    if config.broker.timeout_ms == 0 {
        errors.push(invalid("broker.timeout_ms", "must be greater than 0"));
    }

    let mail = &config.mail;
    if mail.host.as_deref().map_or(true, str::is_empty) {
        errors.push(ValidationError::Missing("SMTP_HOST"));
    }
    if mail.username.as_deref().map_or(true, str::is_empty) {
        errors.push(ValidationError::Missing("SMTP_USER"));
    }
    if mail.password.as_deref().map_or(true, str::is_empty) {
        errors.push(ValidationError::Missing("SMTP_PASSWORD"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_balancer_requires_backends() {
        let config = AppConfig::default();
        let errors = validate_config(Service::LoadBalancer, &config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::Missing("BACKENDS")]);
    }

    #[test]
    fn load_balancer_rejects_bad_backend_and_interval() {
        let mut config = AppConfig::default();
        config.load_balancer.backends = vec!["https://secure:443".into()];
        config.health_check.interval_secs = 0;

        let errors = validate_config(Service::LoadBalancer, &config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn limiter_rejects_zero_burst() {
        let mut config = AppConfig::default();
        config.rate_limiter.burst = 0.0;
        config.rate_limiter.rate = -1.0;

        let errors = validate_config(Service::RateLimiter, &config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn worker_reports_every_missing_credential() {
        let config = AppConfig::default();
        let errors = validate_config(Service::Worker, &config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::Missing("SMTP_HOST"),
                ValidationError::Missing("SMTP_USER"),
                ValidationError::Missing("SMTP_PASSWORD"),
            ]
        );
    }

    #[test]
    fn broker_needs_nothing() {
        assert!(validate_config(Service::Broker, &AppConfig::default()).is_ok());
    }
}
