//! Collaborator interfaces for the update protocol engine and the
//! client/version records behind it.
//!
//! The gateway never parses update manifests or selects versions itself.
//! It calls into an [`UpdateEngine`], a [`VersionResolver`] and an
//! [`IdentifierStore`]; this module defines those seams and the errors
//! each one can surface.

pub mod memory;
pub mod remote;

use std::net::IpAddr;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::InMemoryCatalog;
pub use remote::{RemoteEngine, RemoteEngineConfig};

/// Platform sent with every forced-update lookup.
pub const FORCED_UPDATE_PLATFORM: &str = "win";

/// Lowest possible installed version; makes every client eligible.
pub const FORCED_UPDATE_VERSION: &str = "0.0.0.0";

#[derive(Debug, Error)]
pub enum EngineError {
    /// The payload could not be parsed (e.g. not well-formed XML).
    #[error("malformed update request: {0}")]
    MalformedRequest(String),
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("engine failure: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("version does not exist")]
    NotFound,
    #[error("version lookup failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("identifier query failed: {0}")]
    Backend(String),
}

/// A released build the artifact proxy can serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub file_absolute_url: String,
    pub file_package_name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters of a version lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionQuery {
    pub app_id: String,
    pub channel: String,
    pub user_id: String,
    pub platform: String,
    pub version: String,
}

impl VersionQuery {
    /// Lookup that matches the latest release for any installed version.
    pub fn forced_update(
        app_id: impl Into<String>,
        user_id: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            channel: channel.into(),
            user_id: user_id.into(),
            platform: FORCED_UPDATE_PLATFORM.to_string(),
            version: FORCED_UPDATE_VERSION.to_string(),
        }
    }
}

/// Parses update-check payloads and renders protocol responses.
#[async_trait]
pub trait UpdateEngine: Send + Sync {
    async fn process_update_request(
        &self,
        body: Bytes,
        client_ip: Option<IpAddr>,
    ) -> Result<Bytes, EngineError>;
}

/// Finds the version record matching a query.
#[async_trait]
pub trait VersionResolver: Send + Sync {
    async fn resolve_version(&self, query: &VersionQuery) -> Result<VersionRecord, ResolveError>;
}

/// Looks up distinct client identifiers seen for an application.
#[async_trait]
pub trait IdentifierStore: Send + Sync {
    /// Returns distinct identifiers for `app_id` starting with `prefix`,
    /// at most `limit` of them.
    async fn query_identifiers(
        &self,
        app_id: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_update_query_uses_sentinels() {
        let query = VersionQuery::forced_update("{APP}", "{USER}", "code_red");
        assert_eq!(query.platform, "win");
        assert_eq!(query.version, "0.0.0.0");
        assert_eq!(query.channel, "code_red");
        assert_eq!(query.app_id, "{APP}");
        assert_eq!(query.user_id, "{USER}");
    }
}
