//! Configuration validation.
//!
//! # Responsibilities
//! - Compile every rule once so malformed patterns surface before deployment
//! - Check cache policy header names
//! - Validate tooling settings (addresses, log level)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;
use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::EdgeConfig;
use crate::edge::headers::HeaderRule;
use crate::rules::{compile_rule, CompilationError};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{section}[{index}]: {error}")]
    Rule {
        section: &'static str,
        index: usize,
        #[source]
        error: CompilationError,
    },

    #[error("invalid {field}: '{value}'")]
    InvalidSetting { field: &'static str, value: String },
}

/// Check a configuration, collecting every error found.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (section, rules) in [("redirects", &config.redirects), ("rewrites", &config.rewrites)] {
        for (index, rule) in rules.iter().enumerate() {
            if let Err(error) = compile_rule(&rule.source, &rule.destination) {
                errors.push(ValidationError::Rule { section, index, error });
            }
        }
    }

    for (index, rule) in config.headers.iter().enumerate() {
        if let Err(error) = HeaderRule::compile(&rule.path, &rule.name, &rule.value) {
            errors.push(ValidationError::Rule {
                section: "headers",
                index,
                error,
            });
        }
    }

    for name in &config.cache_policy.allow_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidSetting {
                field: "cache_policy.allow_headers",
                value: name.clone(),
            });
        }
    }

    if config.preview.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidSetting {
            field: "preview.bind_address",
            value: config.preview.bind_address.clone(),
        });
    }

    if config.preview.origin.parse::<Authority>().is_err() {
        errors.push(ValidationError::InvalidSetting {
            field: "preview.origin",
            value: config.preview.origin.clone(),
        });
    }

    if config.preview.request_timeout_secs == 0 {
        errors.push(ValidationError::InvalidSetting {
            field: "preview.request_timeout_secs",
            value: "0".to_string(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidSetting {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_lowercase().as_str()) {
        errors.push(ValidationError::InvalidSetting {
            field: "observability.log_level",
            value: config.observability.log_level.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
