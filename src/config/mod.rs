//! Configuration management for the update gateway
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use update_gateway::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Gateway listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `GATEWAY__<section>__<key>`:
//! - `GATEWAY__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `GATEWAY__ENGINE__ENDPOINT=http://engine:9000`
//!
//! A few deployment variables are also honoured without the prefix:
//! `CODE_RED_CHANNEL`, `SENTRY_DSN` (or `RAVEN_DSN_STACKTRACE`), `HOST_NAME`
//! and `APP_VERSION`.
//!
//! # Configuration File
//!
//! Loaded from `config/gateway.toml` unless `GATEWAY_CONFIG` points elsewhere.

mod models;
mod sources;
mod validation;

pub use models::{
    ArtifactConfig, Config, EngineConfig, ForcedUpdateConfig, ServerConfig, TelemetryConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
