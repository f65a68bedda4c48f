//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (connection limits > 0, listen address)
//! - Detect duplicate locations
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use tokio::sync::Semaphore;
use url::Url;

use crate::config::schema::{PathConfig, ProxyConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid listen address {0:?}")]
    ListenAddress(String),

    #[error("path #{index}: location must not be empty")]
    EmptyLocation { index: usize },

    #[error("location {0:?} must start with '/'")]
    RelativeLocation(String),

    #[error("location {0:?} is configured more than once")]
    DuplicateLocation(String),

    #[error("location {location:?}: invalid target {target:?}: {reason}")]
    InvalidTarget {
        location: String,
        target: String,
        reason: String,
    },

    #[error("location {location:?}: connection_limit must be between 1 and {max}, got {limit}")]
    ConnectionLimit {
        location: String,
        limit: usize,
        max: usize,
    },

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address().parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::ListenAddress(config.server.listen.clone()));
    }

    let mut seen = HashSet::new();
    for (index, path) in config.server.paths.iter().enumerate() {
        validate_path(index, path, &mut errors);
        if !path.location.is_empty() && !seen.insert(path.location.as_str()) {
            errors.push(ValidationError::DuplicateLocation(path.location.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_path(index: usize, path: &PathConfig, errors: &mut Vec<ValidationError>) {
    if path.location.is_empty() {
        errors.push(ValidationError::EmptyLocation { index });
    } else if !path.location.starts_with('/') {
        errors.push(ValidationError::RelativeLocation(path.location.clone()));
    }

    if let Err(reason) = check_target(&path.target) {
        errors.push(ValidationError::InvalidTarget {
            location: path.location.clone(),
            target: path.target.clone(),
            reason,
        });
    }

    if path.connection_limit == 0 || path.connection_limit > Semaphore::MAX_PERMITS {
        errors.push(ValidationError::ConnectionLimit {
            location: path.location.clone(),
            limit: path.connection_limit,
            max: Semaphore::MAX_PERMITS,
        });
    }
}

fn check_target(target: &str) -> Result<(), String> {
    let url = Url::parse(target).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme {:?}, only http is supported", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
