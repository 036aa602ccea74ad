use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "GATEWAY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/gateway.toml";
const ENV_PREFIX: &str = "GATEWAY";
const ENV_SEPARATOR: &str = "__";

/// Legacy deployment variables read directly from the environment.
const CHANNEL_ENV_VAR: &str = "CODE_RED_CHANNEL";
const DSN_ENV_VARS: &[&str] = &["SENTRY_DSN", "RAVEN_DSN_STACKTRACE"];
const HOST_NAME_ENV_VAR: &str = "HOST_NAME";
const RELEASE_ENV_VAR: &str = "APP_VERSION";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;
    apply_deployment_env(&mut config, |key| env::var(key).ok());

    Ok(config)
}

/// Apply the plain (unprefixed) deployment variables.
/// The DSN is a secret and only ever comes from here, never from TOML.
pub(crate) fn apply_deployment_env<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(channel) = lookup(CHANNEL_ENV_VAR).filter(|v| !v.is_empty()) {
        config.forced_update.channel = channel;
    }

    if let Some(dsn) = DSN_ENV_VARS
        .iter()
        .find_map(|key| lookup(key).filter(|v| !v.is_empty()))
    {
        config.telemetry.dsn = Some(dsn);
    }

    if config.telemetry.server_name.is_none() {
        config.telemetry.server_name = lookup(HOST_NAME_ENV_VAR);
    }
    if config.telemetry.release.is_none() {
        config.telemetry.release = lookup(RELEASE_ENV_VAR);
    }
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // GATEWAY__SERVER__BIND_ADDR -> server.bind_addr
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.forced_update.channel, "code_red");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:9100"
max_body_bytes = 65536
client_ip_headers = ["x-real-ip"]

[engine]
endpoint = "http://engine.internal:9000"

[telemetry]
server_name = "gw-eu-1"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9100");
        assert_eq!(config.server.max_body_bytes, 65536);
        assert_eq!(config.server.client_ip_headers, vec!["x-real-ip"]);
        assert_eq!(config.engine.endpoint, "http://engine.internal:9000");
        assert_eq!(config.telemetry.server_name.as_deref(), Some("gw-eu-1"));
    }

    // Process-wide env mutation is avoided; the lookup is injected instead.
    #[test]
    fn test_deployment_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CODE_RED_CHANNEL", "hotfix"),
            ("RAVEN_DSN_STACKTRACE", "https://key@sentry.example.com/1"),
            ("HOST_NAME", "gw-1"),
            ("APP_VERSION", "2.3.0"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_deployment_env(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.forced_update.channel, "hotfix");
        assert_eq!(
            config.telemetry.dsn.as_deref(),
            Some("https://key@sentry.example.com/1")
        );
        assert_eq!(config.telemetry.server_name.as_deref(), Some("gw-1"));
        assert_eq!(config.telemetry.release.as_deref(), Some("2.3.0"));
    }

    #[test]
    fn test_empty_channel_keeps_default() {
        let mut config = Config::default();
        apply_deployment_env(&mut config, |key| {
            (key == "CODE_RED_CHANNEL").then(String::new)
        });
        assert_eq!(config.forced_update.channel, "code_red");
    }

    #[test]
    fn test_sentry_dsn_preferred_over_legacy_name() {
        let mut config = Config::default();
        apply_deployment_env(&mut config, |key| match key {
            "SENTRY_DSN" => Some("https://new@sentry.example.com/2".to_string()),
            "RAVEN_DSN_STACKTRACE" => Some("https://old@sentry.example.com/1".to_string()),
            _ => None,
        });
        assert_eq!(
            config.telemetry.dsn.as_deref(),
            Some("https://new@sentry.example.com/2")
        );
    }
}
