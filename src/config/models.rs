use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub artifact: ArtifactConfig,
    #[serde(default)]
    pub forced_update: ForcedUpdateConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Largest accepted update-check body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Headers consulted, in order, for the client address before falling
    /// back to the socket peer. Empty means headers are never trusted.
    #[serde(default = "default_client_ip_headers")]
    pub client_ip_headers: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_body_bytes: default_max_body_bytes(),
            client_ip_headers: default_client_ip_headers(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_body_bytes() -> usize {
    1024 * 1024 // 1 MB
}

fn default_client_ip_headers() -> Vec<String> {
    vec!["x-forwarded-for".to_string(), "x-real-ip".to_string()]
}

/// Protocol engine service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_engine_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_engine_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl EngineConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: default_engine_endpoint(),
            connect_timeout_secs: default_engine_connect_timeout_secs(),
            request_timeout_secs: default_engine_request_timeout_secs(),
        }
    }
}

fn default_engine_endpoint() -> String {
    "http://127.0.0.1:9000".to_string()
}

fn default_engine_connect_timeout_secs() -> u64 {
    5
}

fn default_engine_request_timeout_secs() -> u64 {
    30
}

/// Upstream artifact store fetches
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_artifact_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_artifact_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl ArtifactConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_artifact_connect_timeout_secs(),
            request_timeout_secs: default_artifact_request_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_artifact_connect_timeout_secs() -> u64 {
    10
}

fn default_artifact_request_timeout_secs() -> u64 {
    300
}

fn default_max_redirects() -> usize {
    10
}

/// Forced ("code red") update downloads
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForcedUpdateConfig {
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl Default for ForcedUpdateConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
        }
    }
}

fn default_channel() -> String {
    "code_red".to_string()
}

/// Error tracker / usage statistics collector
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Collector DSN (loaded from environment, not from config file)
    #[serde(skip)]
    pub dsn: Option<String>,
    pub server_name: Option<String>,
    pub release: Option<String>,
    #[serde(default = "default_telemetry_timeout_secs")]
    pub timeout_secs: u64,
}

impl TelemetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            server_name: None,
            release: None,
            timeout_secs: default_telemetry_timeout_secs(),
        }
    }
}

fn default_telemetry_timeout_secs() -> u64 {
    5
}
