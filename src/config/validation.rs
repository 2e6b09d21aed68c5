//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// Smallest line limit that still fits a minimal request line.
pub const MIN_LINE_LENGTH: usize = 16;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,
    #[error("relay.max_line_length must be at least {min}, got {0}", min = MIN_LINE_LENGTH)]
    LineLengthTooSmall(usize),
    #[error("relay.chunk_size must be greater than zero")]
    ZeroChunkSize,
    #[error("relay.connect_timeout_ms must be greater than zero when set")]
    ZeroConnectTimeout,
    #[error("dispatch.max_clients must be greater than zero")]
    ZeroMaxClients,
    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),
    #[error("observability.metrics_address {0:?} is not a socket address")]
    BadMetricsAddress(String),
}

/// Check every semantic rule, collecting all violations.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.relay.max_line_length < MIN_LINE_LENGTH {
        errors.push(ValidationError::LineLengthTooSmall(config.relay.max_line_length));
    }
    if config.relay.chunk_size == 0 {
        errors.push(ValidationError::ZeroChunkSize);
    }
    if config.relay.connect_timeout_ms == Some(0) {
        errors.push(ValidationError::ZeroConnectTimeout);
    }
    if config.dispatch.max_clients == 0 {
        errors.push(ValidationError::ZeroMaxClients);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::BadMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
