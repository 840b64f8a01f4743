//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, value ranges and enumerated settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::http::response::Charset;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("unsupported charset {0:?}")]
    Charset(String),

    #[error("{field}: unknown value {value:?}, expected one of {expected:?}")]
    UnknownValue {
        field: &'static str,
        value: String,
        expected: &'static [&'static str],
    },
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_one_of(
    field: &'static str,
    value: &str,
    expected: &'static [&'static str],
    errors: &mut Vec<ValidationError>,
) {
    if !expected.contains(&value.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownValue {
            field,
            value: value.to_string(),
            expected,
        });
    }
}

/// Check `config`, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_body_bytes" });
    }

    if config.app.static_marker().is_empty() {
        errors.push(ValidationError::Empty { field: "app.static_dir" });
    }
    if config.app.template_dir.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "app.template_dir" });
    }
    if config.app.charset.parse::<Charset>().is_err() {
        errors.push(ValidationError::Charset(config.app.charset.clone()));
    }
    if matches!(config.app.cookie_secret.as_deref(), Some("")) {
        errors.push(ValidationError::Empty { field: "app.cookie_secret" });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }

    let observability = &config.observability;
    check_one_of("observability.log_level", &observability.log_level, LOG_LEVELS, &mut errors);
    check_one_of("observability.log_format", &observability.log_format, LOG_FORMATS, &mut errors);
    if observability.metrics_enabled {
        check_address("observability.metrics_address", &observability.metrics_address, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
