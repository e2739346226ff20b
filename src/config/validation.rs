//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid, limits large enough)
//! - Validate addresses that are parsed later at startup
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// Smallest accepted start line or field size limit in bytes.
pub const MIN_SIZE_LIMIT: usize = 255;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("property {0} is missing")]
    Missing(&'static str),

    #[error("property {key} is not valid: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("property {key} must be greater than zero")]
    Zero { key: &'static str },

    #[error("property {key} must be at least {min}: {value}")]
    TooSmall {
        key: &'static str,
        min: usize,
        value: usize,
    },
}

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.proxy.port == 0 {
        errors.push(ValidationError::Missing("proxy.port"));
    }
    if config.proxy.bind_host.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::Invalid {
            key: "proxy.bind_host",
            value: config.proxy.bind_host.clone(),
        });
    }
    non_zero(&mut errors, "proxy.max_connections", config.proxy.max_connections as u64);

    let target = &config.target;
    if target.address.trim().is_empty() {
        errors.push(ValidationError::Missing("target.address"));
    } else if target.address.chars().any(char::is_whitespace) {
        errors.push(ValidationError::Invalid {
            key: "target.address",
            value: target.address.clone(),
        });
    }
    if target.port == 0 {
        errors.push(ValidationError::Missing("target.port"));
    }
    non_zero(&mut errors, "target.connect_timeout_ms", target.connect_timeout_ms);

    let request = &config.http.request;
    non_zero(&mut errors, "http.request.receive_timeout_ms", request.receive_timeout_ms);
    at_least(&mut errors, "http.request.request_line_size_limit", request.request_line_size_limit, MIN_SIZE_LIMIT);
    at_least(&mut errors, "http.request.fields_limit", request.fields_limit, 1);
    at_least(&mut errors, "http.request.field_size_limit", request.field_size_limit, MIN_SIZE_LIMIT);

    let response = &config.http.response;
    non_zero(&mut errors, "http.response.receive_timeout_ms", response.receive_timeout_ms);
    at_least(&mut errors, "http.response.status_line_size_limit", response.status_line_size_limit, MIN_SIZE_LIMIT);
    at_least(&mut errors, "http.response.fields_limit", response.fields_limit, 1);
    at_least(&mut errors, "http.response.field_size_limit", response.field_size_limit, MIN_SIZE_LIMIT);

    non_zero(
        &mut errors,
        "connection_handlers.termination_timeout_ms",
        config.connection_handlers.termination_timeout_ms,
    );

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Invalid {
            key: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn non_zero(errors: &mut Vec<ValidationError>, key: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { key });
    }
}

fn at_least(errors: &mut Vec<ValidationError>, key: &'static str, value: usize, min: usize) {
    if value < min {
        errors.push(ValidationError::TooSmall { key, min, value });
    }
}
