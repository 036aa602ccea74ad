//! Shared fixtures for the gateway integration tests

#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    http::StatusCode,
    response::Redirect,
    routing::get,
};
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};

use update_gateway::api::state::AppState;
use update_gateway::artifact::{ArtifactFetcher, FetchConfig};
use update_gateway::config::Config;
use update_gateway::engine::{EngineError, InMemoryCatalog, UpdateEngine};
use update_gateway::telemetry::{TelemetryError, TelemetryEvent, TelemetrySink};

/// Echoes well-formed XML bodies wrapped in a response element, rejects
/// anything else as malformed, and fails outright on `<?xml?><crash/>`.
#[derive(Default)]
pub struct ScriptedEngine {
    pub seen_ips: Mutex<Vec<Option<IpAddr>>>,
}

#[async_trait]
impl UpdateEngine for ScriptedEngine {
    async fn process_update_request(
        &self,
        body: Bytes,
        client_ip: Option<IpAddr>,
    ) -> Result<Bytes, EngineError> {
        self.seen_ips.lock().await.push(client_ip);

        if body.as_ref() == b"<?xml?><crash/>" {
            return Err(EngineError::Internal("engine crashed".into()));
        }
        if !body.starts_with(b"<?xml") {
            return Err(EngineError::MalformedRequest("not well-formed".into()));
        }

        let mut response = b"<response>".to_vec();
        response.extend_from_slice(&body);
        response.extend_from_slice(b"</response>");
        Ok(Bytes::from(response))
    }
}

/// Hands every captured event to the test through a channel.
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<TelemetryEvent>,
}

impl RecordingSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TelemetryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl TelemetrySink for RecordingSink {
    async fn capture(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
        let _ = self.tx.send(event);
        Ok(())
    }
}

/// Collector that is always down.
pub struct FailingSink;

#[async_trait]
impl TelemetrySink for FailingSink {
    async fn capture(&self, _event: TelemetryEvent) -> Result<(), TelemetryError> {
        Err(TelemetryError::Delivery("connection refused".into()))
    }
}

/// Deterministic installer bytes, large enough to span several chunks.
pub fn installer_bytes() -> Vec<u8> {
    (0..256 * 1024).map(|i| (i % 251) as u8).collect()
}

/// Local stand-in for the artifact store.
pub async fn spawn_artifact_store() -> SocketAddr {
    let app = Router::new()
        .route("/files/setup.exe", get(|| async { installer_bytes() }))
        .route(
            "/redirect/setup.exe",
            get(|| async { Redirect::temporary("/files/setup.exe") }),
        )
        .route(
            "/files/broken.exe",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub struct TestGateway {
    pub app: Router,
    pub engine: Arc<ScriptedEngine>,
    pub catalog: Arc<InMemoryCatalog>,
    pub state: AppState,
}

pub fn build_gateway(config: Config, sink: Arc<dyn TelemetrySink>) -> TestGateway {
    let engine = Arc::new(ScriptedEngine::default());
    let catalog = Arc::new(InMemoryCatalog::new());
    let fetcher = ArtifactFetcher::new(FetchConfig::default()).expect("fetcher");

    let state = AppState::new(
        config,
        engine.clone(),
        catalog.clone(),
        catalog.clone(),
        sink,
        fetcher,
    );

    TestGateway {
        app: update_gateway::api::router(state.clone()),
        engine,
        catalog,
        state,
    }
}
