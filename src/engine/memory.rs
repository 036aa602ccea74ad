//! In-memory version and identifier catalog for tests and local development

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{IdentifierStore, ResolveError, StoreError, VersionQuery, VersionRecord, VersionResolver};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ReleaseKey {
    app_id: String,
    channel: String,
    platform: String,
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    releases: RwLock<BTreeMap<ReleaseKey, VersionRecord>>,
    // (app_id, identifier) in insertion order
    identifiers: RwLock<Vec<(String, String)>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the current release for an app/channel/platform triple.
    pub async fn add_release(
        &self,
        app_id: impl Into<String>,
        channel: impl Into<String>,
        platform: impl Into<String>,
        record: VersionRecord,
    ) {
        let key = ReleaseKey {
            app_id: app_id.into(),
            channel: channel.into(),
            platform: platform.into(),
        };
        self.releases.write().await.insert(key, record);
    }

    /// Record that a client identifier was seen for an app.
    pub async fn add_identifier(&self, app_id: impl Into<String>, identifier: impl Into<String>) {
        self.identifiers
            .write()
            .await
            .push((app_id.into(), identifier.into()));
    }
}

#[async_trait]
impl VersionResolver for InMemoryCatalog {
    async fn resolve_version(&self, query: &VersionQuery) -> Result<VersionRecord, ResolveError> {
        let key = ReleaseKey {
            app_id: query.app_id.clone(),
            channel: query.channel.clone(),
            platform: query.platform.clone(),
        };

        self.releases
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or(ResolveError::NotFound)
    }
}

#[async_trait]
impl IdentifierStore for InMemoryCatalog {
    async fn query_identifiers(
        &self,
        app_id: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let identifiers = self.identifiers.read().await;
        let mut found: Vec<String> = Vec::new();

        for (app, identifier) in identifiers.iter() {
            if found.len() >= limit {
                break;
            }
            if app == app_id && identifier.starts_with(prefix) && !found.contains(identifier) {
                found.push(identifier.clone());
            }
        }

        Ok(found)
    }
}
