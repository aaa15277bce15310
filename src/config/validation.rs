//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate backend URLs and the listen address
//! - Validate value ranges (probe timeout strictly shorter than interval)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the config
//! - Runs before the config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no backend servers configured")]
    NoServers,

    #[error("invalid server url '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },

    #[error("unsupported scheme '{scheme}' for server '{url}': only http backends are supported")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("invalid listen address '{addr}': {reason}")]
    InvalidBindAddress { addr: String, reason: String },

    #[error("health check interval must be greater than zero")]
    ZeroHealthInterval,

    #[error("health check timeout must be greater than zero and strictly shorter than the interval")]
    HealthTimeoutTooLong,

    #[error("health check path '{path}' must start with '/'")]
    InvalidHealthPath { path: String },
}

/// Validate a deserialized configuration.
///
/// Collects every problem instead of stopping at the first, so a broken
/// config file can be fixed in one pass.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }

    for raw in &config.servers {
        match Url::parse(raw) {
            Ok(url) => {
                if url.scheme() != "http" {
                    errors.push(ValidationError::UnsupportedScheme {
                        url: raw.clone(),
                        scheme: url.scheme().to_string(),
                    });
                }
            }
            Err(e) => {
                errors.push(ValidationError::InvalidServerUrl {
                    url: raw.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if let Err(e) = config.listener.bind_address.parse::<SocketAddr>() {
        errors.push(ValidationError::InvalidBindAddress {
            addr: config.listener.bind_address.clone(),
            reason: e.to_string(),
        });
    }

    if config.health_check.interval.is_zero() {
        errors.push(ValidationError::ZeroHealthInterval);
    }
    if config.health_check.timeout.is_zero()
        || config.health_check.timeout >= config.health_check.interval
    {
        errors.push(ValidationError::HealthTimeoutTooLong);
    }
    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::InvalidHealthPath {
            path: config.health_check.path.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
