use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use update_gateway::api::{self, state::AppState};
use update_gateway::artifact::{ArtifactFetcher, FetchConfig};
use update_gateway::config::Config;
use update_gateway::engine::{RemoteEngine, RemoteEngineConfig};
use update_gateway::telemetry::{Dsn, LogSink, SentrySink, TelemetrySink};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Load configuration, wire collaborators and serve.
pub async fn run(address: Option<SocketAddr>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = Config::load().map_err(|e| format!("Failed to load config: {}", e))?;
    let address = address.unwrap_or(config.server.bind_addr);

    info!(endpoint = %config.engine.endpoint, "Connecting to protocol engine");
    let engine = Arc::new(
        RemoteEngine::new(RemoteEngineConfig {
            endpoint: config.engine.endpoint.clone(),
            connect_timeout: config.engine.connect_timeout(),
            request_timeout: config.engine.request_timeout(),
            ..Default::default()
        })
        .map_err(|e| format!("Failed to build engine client: {}", e))?,
    );

    let fetcher = ArtifactFetcher::new(FetchConfig {
        connect_timeout: config.artifact.connect_timeout(),
        request_timeout: config.artifact.request_timeout(),
        max_redirects: config.artifact.max_redirects,
        ..Default::default()
    })
    .map_err(|e| format!("Failed to build artifact client: {}", e))?;

    let telemetry = build_telemetry(&config)?;

    let state = AppState::new(
        config,
        engine.clone(),
        engine.clone(),
        engine,
        telemetry,
        fetcher,
    );

    api::run(address, state).await
}

fn build_telemetry(config: &Config) -> Result<Arc<dyn TelemetrySink>, AnyError> {
    let Some(raw) = &config.telemetry.dsn else {
        warn!("No telemetry DSN configured, events will only be logged");
        return Ok(Arc::new(LogSink));
    };

    let dsn: Dsn = raw.parse()?;
    info!(collector = %dsn, "Forwarding telemetry");

    let sink = SentrySink::new(
        dsn,
        config.telemetry.server_name.clone(),
        config.telemetry.release.clone(),
        config.telemetry.timeout(),
    )?;
    Ok(Arc::new(sink))
}
