//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every failure.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a valid socket address: {}", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.upstream.chat_url) {
        Ok(url) => {
            if url.scheme() != "http" {
                errors.push(ValidationError::new(
                    "upstream.chat_url",
                    format!("unsupported scheme {:?}, only http upstreams are supported", url.scheme()),
                ));
            }
            if url.host_str().is_none() {
                errors.push(ValidationError::new("upstream.chat_url", "missing host"));
            }
        }
        Err(e) => {
            errors.push(ValidationError::new(
                "upstream.chat_url",
                format!("not a valid URL: {e}"),
            ));
        }
    }

    if config.health_check.enabled {
        if config.health_check.interval_secs == 0 {
            errors.push(ValidationError::new(
                "health_check.interval_secs",
                "must be nonzero",
            ));
        }
        if config.health_check.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "health_check.timeout_secs",
                "must be nonzero",
            ));
        }
        if config.health_check.unhealthy_threshold == 0 {
            errors.push(ValidationError::new(
                "health_check.unhealthy_threshold",
                "must be nonzero",
            ));
        }
        if config.health_check.healthy_threshold == 0 {
            errors.push(ValidationError::new(
                "health_check.healthy_threshold",
                "must be nonzero",
            ));
        }
        if !config.health_check.path.starts_with('/') {
            errors.push(ValidationError::new(
                "health_check.path",
                format!("must start with '/': {}", config.health_check.path),
            ));
        }
    }

    if config.timeouts.upstream_secs == Some(0) {
        errors.push(ValidationError::new(
            "timeouts.upstream_secs",
            "must be nonzero when set",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a valid socket address: {}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
