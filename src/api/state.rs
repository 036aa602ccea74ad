use std::sync::Arc;

use crate::artifact::ArtifactFetcher;
use crate::config::Config;
use crate::engine::{IdentifierStore, UpdateEngine, VersionResolver};
use crate::observability::GatewayMetrics;
use crate::telemetry::TelemetrySink;

/// Everything a handler needs. Collaborators are trait objects so tests can
/// substitute fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<dyn UpdateEngine>,
    pub versions: Arc<dyn VersionResolver>,
    pub identifiers: Arc<dyn IdentifierStore>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub fetcher: Arc<ArtifactFetcher>,
    pub metrics: Arc<GatewayMetrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        engine: Arc<dyn UpdateEngine>,
        versions: Arc<dyn VersionResolver>,
        identifiers: Arc<dyn IdentifierStore>,
        telemetry: Arc<dyn TelemetrySink>,
        fetcher: ArtifactFetcher,
    ) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            versions,
            identifiers,
            telemetry,
            fetcher: Arc::new(fetcher),
            metrics: Arc::new(GatewayMetrics::new()),
        }
    }
}
