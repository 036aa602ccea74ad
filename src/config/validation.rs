use super::models::Config;
use crate::telemetry::Dsn;
use axum::http::HeaderName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Engine endpoint '{endpoint}' must be an http:// or https:// URL")]
    InvalidEngineEndpoint { endpoint: String },

    #[error("max_body_bytes must be positive")]
    InvalidBodyLimit,

    #[error("Timeout must be positive: {field}")]
    InvalidTimeout { field: String },

    #[error("Forced-update channel must not be empty")]
    EmptyChannel,

    #[error("Invalid client IP header name '{header}'")]
    InvalidClientIpHeader { header: String },

    #[error("Invalid telemetry DSN: {reason}")]
    InvalidDsn { reason: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_engine(config)?;
    validate_timeouts(config)?;
    validate_forced_update(config)?;
    validate_telemetry(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.max_body_bytes == 0 {
        return Err(ValidationError::InvalidBodyLimit);
    }

    for header in &config.server.client_ip_headers {
        if HeaderName::from_bytes(header.as_bytes()).is_err() {
            return Err(ValidationError::InvalidClientIpHeader {
                header: header.clone(),
            });
        }
    }

    Ok(())
}

fn validate_engine(config: &Config) -> Result<(), ValidationError> {
    let endpoint = &config.engine.endpoint;
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ValidationError::InvalidEngineEndpoint {
            endpoint: endpoint.clone(),
        });
    }
    Ok(())
}

fn validate_timeouts(config: &Config) -> Result<(), ValidationError> {
    let timeouts = [
        ("engine.connect_timeout_secs", config.engine.connect_timeout_secs),
        ("engine.request_timeout_secs", config.engine.request_timeout_secs),
        ("artifact.connect_timeout_secs", config.artifact.connect_timeout_secs),
        ("artifact.request_timeout_secs", config.artifact.request_timeout_secs),
        ("telemetry.timeout_secs", config.telemetry.timeout_secs),
    ];

    for (field, value) in timeouts {
        if value == 0 {
            return Err(ValidationError::InvalidTimeout {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_forced_update(config: &Config) -> Result<(), ValidationError> {
    if config.forced_update.channel.trim().is_empty() {
        return Err(ValidationError::EmptyChannel);
    }
    Ok(())
}

fn validate_telemetry(config: &Config) -> Result<(), ValidationError> {
    if let Some(dsn) = &config.telemetry.dsn {
        dsn.parse::<Dsn>()
            .map_err(|e| ValidationError::InvalidDsn {
                reason: e.to_string(),
            })?;
    }
    Ok(())
}
