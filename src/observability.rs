//! Request counters and log initialisation

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` overrides the default `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Counters for the gateway endpoints
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    update_requests: AtomicU64,
    malformed_updates: AtomicU64,
    telemetry_forwarded: AtomicU64,
    telemetry_dropped: AtomicU64,
    artifacts_served: AtomicU64,
    artifact_failures: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_request(&self) {
        self.update_requests.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "update_requests", "Metric incremented");
    }

    pub fn malformed_update(&self) {
        self.malformed_updates.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "malformed_updates", "Metric incremented");
    }

    pub fn telemetry_forwarded(&self) {
        self.telemetry_forwarded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "telemetry_forwarded", "Metric incremented");
    }

    pub fn telemetry_dropped(&self) {
        self.telemetry_dropped.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "telemetry_dropped", "Metric incremented");
    }

    pub fn artifact_served(&self) {
        self.artifacts_served.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "artifacts_served", "Metric incremented");
    }

    pub fn artifact_failed(&self) {
        self.artifact_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "artifact_failures", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            update_requests: self.update_requests.load(Ordering::Relaxed),
            malformed_updates: self.malformed_updates.load(Ordering::Relaxed),
            telemetry_forwarded: self.telemetry_forwarded.load(Ordering::Relaxed),
            telemetry_dropped: self.telemetry_dropped.load(Ordering::Relaxed),
            artifacts_served: self.artifacts_served.load(Ordering::Relaxed),
            artifact_failures: self.artifact_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub update_requests: u64,
    pub malformed_updates: u64,
    pub telemetry_forwarded: u64,
    pub telemetry_dropped: u64,
    pub artifacts_served: u64,
    pub artifact_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let metrics = GatewayMetrics::new();
        metrics.update_request();
        metrics.update_request();
        metrics.malformed_update();
        metrics.artifact_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.update_requests, 2);
        assert_eq!(snapshot.malformed_updates, 1);
        assert_eq!(snapshot.artifact_failures, 1);
        assert_eq!(snapshot.artifacts_served, 0);
    }
}
