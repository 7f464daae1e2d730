//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, thresholds >= 1)
//! - Validate addresses and log levels
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CoordinatorConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::CoordinatorConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("watchdog.interval_ms must be greater than 0")]
    ZeroWatchdogInterval,

    #[error("watchdog.timeout_ms must be greater than 0")]
    ZeroWatchdogTimeout,

    #[error("watchdog.timeout_ms ({timeout_ms}) exceeds watchdog.interval_ms ({interval_ms})")]
    WatchdogTimeoutExceedsInterval { timeout_ms: u64, interval_ms: u64 },

    #[error("watchdog.{0} must be at least 1")]
    ZeroThreshold(&'static str),

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Check every semantic rule and collect all violations.
pub fn validate_config(config: &CoordinatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let watchdog = &config.watchdog;
    if watchdog.interval_ms == 0 {
        errors.push(ValidationError::ZeroWatchdogInterval);
    }
    if watchdog.timeout_ms == 0 {
        errors.push(ValidationError::ZeroWatchdogTimeout);
    }
    if watchdog.interval_ms > 0 && watchdog.timeout_ms > watchdog.interval_ms {
        errors.push(ValidationError::WatchdogTimeoutExceedsInterval {
            timeout_ms: watchdog.timeout_ms,
            interval_ms: watchdog.interval_ms,
        });
    }
    if watchdog.unhealthy_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold("unhealthy_threshold"));
    }
    if watchdog.healthy_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold("healthy_threshold"));
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
