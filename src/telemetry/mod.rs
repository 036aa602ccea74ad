//! Error-tracking and usage-statistics sink
//!
//! The gateway reports two kinds of events: client usage statistics relayed
//! from `/usagestats`, and malformed update requests. Both go through a
//! [`TelemetrySink`] injected into the application state. Delivery is
//! best-effort: [`dispatch`] runs the capture on a background task and only
//! logs failures.

mod sentry;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::observability::GatewayMetrics;

pub use sentry::{Dsn, SentrySink};

/// Logger name attached to relayed client usage statistics.
pub const USAGE_STATS_LOGGER: &str = "usagestats";

/// Logger name attached to update-request failures.
pub const UPDATE_LOGGER: &str = "update";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid DSN: {0}")]
    InvalidDsn(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("sink rejected event: HTTP {0}")]
    Rejected(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    pub message: String,
    pub level: EventLevel,
    pub logger: String,
    pub tags: BTreeMap<String, String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TelemetryEvent {
    pub fn new(level: EventLevel, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            logger: logger.into(),
            tags: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn capture(&self, event: TelemetryEvent) -> Result<(), TelemetryError>;
}

/// Sink used when no collector is configured; events end up in the log.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait]
impl TelemetrySink for LogSink {
    async fn capture(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
        match event.level {
            EventLevel::Error => tracing::error!(logger = %event.logger, tags = ?event.tags, "{}", event.message),
            EventLevel::Warning => tracing::warn!(logger = %event.logger, tags = ?event.tags, "{}", event.message),
            EventLevel::Info => tracing::info!(logger = %event.logger, tags = ?event.tags, "{}", event.message),
            EventLevel::Debug => tracing::debug!(logger = %event.logger, tags = ?event.tags, "{}", event.message),
        }
        Ok(())
    }
}

/// Capture `event` on a background task. Failures are logged and counted,
/// never returned.
pub fn dispatch(
    sink: Arc<dyn TelemetrySink>,
    metrics: Arc<GatewayMetrics>,
    event: TelemetryEvent,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let logger = event.logger.clone();
        match sink.capture(event).await {
            Ok(()) => metrics.telemetry_forwarded(),
            Err(e) => {
                metrics.telemetry_dropped();
                tracing::warn!(logger = %logger, error = %e, "Telemetry event dropped");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    #[async_trait]
    impl TelemetrySink for FailingSink {
        async fn capture(&self, _event: TelemetryEvent) -> Result<(), TelemetryError> {
            Err(TelemetryError::Delivery("collector down".into()))
        }
    }

    #[tokio::test]
    async fn dispatch_counts_delivery_outcomes() {
        let metrics = Arc::new(GatewayMetrics::new());
        let event = TelemetryEvent::new(EventLevel::Info, USAGE_STATS_LOGGER, "payload");

        dispatch(Arc::new(LogSink), metrics.clone(), event.clone())
            .await
            .unwrap();
        dispatch(Arc::new(FailingSink), metrics.clone(), event)
            .await
            .unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.telemetry_forwarded, 1);
        assert_eq!(snapshot.telemetry_dropped, 1);
    }

    #[test]
    fn event_builder_sets_fields() {
        let mut tags = BTreeMap::new();
        tags.insert("appid".to_string(), "{APP}".to_string());

        let event = TelemetryEvent::new(EventLevel::Error, UPDATE_LOGGER, "bad")
            .with_tags(tags.clone())
            .with_extra("body_len", 12);

        assert_eq!(event.tags, tags);
        assert_eq!(event.extra["body_len"], serde_json::json!(12));
        assert_eq!(event.logger, "update");
    }
}
