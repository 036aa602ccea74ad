//! HTTP client for a protocol engine running as a separate service
//!
//! Endpoints consumed:
//! - `POST {endpoint}/update` - raw update-check body in, raw response out
//! - `GET {endpoint}/versions/resolve` - version record as JSON
//! - `GET {endpoint}/identifiers` - JSON array of identifier strings

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{
    EngineError, IdentifierStore, ResolveError, StoreError, UpdateEngine, VersionQuery,
    VersionRecord, VersionResolver,
};

/// Connection settings for [`RemoteEngine`]
#[derive(Debug, Clone)]
pub struct RemoteEngineConfig {
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for RemoteEngineConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9000".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("update-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub struct RemoteEngine {
    client: Client,
    endpoint: String,
}

impl RemoteEngine {
    pub fn new(config: RemoteEngineConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| EngineError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}

#[async_trait]
impl UpdateEngine for RemoteEngine {
    async fn process_update_request(
        &self,
        body: Bytes,
        client_ip: Option<IpAddr>,
    ) -> Result<Bytes, EngineError> {
        let mut request = self.client.post(self.url("/update")).body(body);
        if let Some(ip) = client_ip {
            request = request.header("X-Forwarded-For", ip.to_string());
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;

        let status = response.status();
        let payload = response
            .bytes()
            .await
            .map_err(|e| EngineError::Unavailable(format!("Failed to read body: {}", e)))?;

        debug!(status = status.as_u16(), size = payload.len(), "Engine responded");

        match status {
            s if s.is_success() => Ok(payload),
            StatusCode::BAD_REQUEST => Err(EngineError::MalformedRequest(
                String::from_utf8_lossy(&payload).into_owned(),
            )),
            s => Err(EngineError::Internal(format!("engine returned HTTP {}", s.as_u16()))),
        }
    }
}

#[async_trait]
impl VersionResolver for RemoteEngine {
    async fn resolve_version(&self, query: &VersionQuery) -> Result<VersionRecord, ResolveError> {
        let response = self
            .client
            .get(self.url("/versions/resolve"))
            .query(&[
                ("appid", query.app_id.as_str()),
                ("channel", query.channel.as_str()),
                ("userid", query.user_id.as_str()),
                ("platform", query.platform.as_str()),
                ("version", query.version.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ResolveError::Backend(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ResolveError::NotFound),
            s if s.is_success() => response
                .json::<VersionRecord>()
                .await
                .map_err(|e| ResolveError::Backend(format!("invalid version record: {}", e))),
            s => Err(ResolveError::Backend(format!("HTTP {}", s.as_u16()))),
        }
    }
}

#[async_trait]
impl IdentifierStore for RemoteEngine {
    async fn query_identifiers(
        &self,
        app_id: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(self.url("/identifiers"))
            .query(&[("app_id", app_id), ("prefix", prefix), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Backend(format!("HTTP {}", status.as_u16())));
        }

        response
            .json::<Vec<String>>()
            .await
            .map_err(|e| StoreError::Backend(format!("invalid identifier list: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Query,
        http::StatusCode as AxumStatus,
        response::IntoResponse,
        routing::{get, post},
    };
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn fake_update(body: Bytes) -> impl IntoResponse {
        if body.starts_with(b"<?xml") {
            (AxumStatus::OK, body.to_vec())
        } else {
            (AxumStatus::BAD_REQUEST, b"not xml".to_vec())
        }
    }

    async fn fake_resolve(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
        if params.get("appid").map(String::as_str) == Some("{KNOWN}")
            && params.get("version").map(String::as_str) == Some("0.0.0.0")
        {
            Json(serde_json::json!({
                "file_absolute_url": "https://cdn.example.com/setup.exe",
                "file_package_name": "setup.exe"
            }))
            .into_response()
        } else {
            AxumStatus::NOT_FOUND.into_response()
        }
    }

    async fn fake_identifiers(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
        let prefix = params.get("prefix").cloned().unwrap_or_default();
        Json(vec![format!("{prefix}-1}}")])
    }

    async fn spawn_fake_engine() -> RemoteEngine {
        let app = Router::new()
            .route("/update", post(fake_update))
            .route("/versions/resolve", get(fake_resolve))
            .route("/identifiers", get(fake_identifiers));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        RemoteEngine::new(RemoteEngineConfig {
            endpoint: format!("http://{addr}/"),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn update_passthrough_and_malformed() {
        let engine = spawn_fake_engine().await;

        let ok = engine
            .process_update_request(Bytes::from_static(b"<?xml version=\"1.0\"?><r/>"), None)
            .await
            .unwrap();
        assert_eq!(&ok[..], b"<?xml version=\"1.0\"?><r/>");

        let err = engine
            .process_update_request(Bytes::from_static(b"garbage"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedRequest(_)));
    }

    #[tokio::test]
    async fn resolve_maps_not_found() {
        let engine = spawn_fake_engine().await;

        let found = engine
            .resolve_version(&VersionQuery::forced_update("{KNOWN}", "", "code_red"))
            .await
            .unwrap();
        assert_eq!(found.file_package_name, "setup.exe");

        let missing = engine
            .resolve_version(&VersionQuery::forced_update("{UNKNOWN}", "", "code_red"))
            .await;
        assert!(matches!(missing, Err(ResolveError::NotFound)));
    }

    #[tokio::test]
    async fn identifiers_decoded() {
        let engine = spawn_fake_engine().await;
        let ids = engine.query_identifiers("app", "{AB", 10).await.unwrap();
        assert_eq!(ids, vec!["{AB-1}".to_string()]);
    }

    #[tokio::test]
    async fn unreachable_engine_is_unavailable() {
        let engine = RemoteEngine::new(RemoteEngineConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            connect_timeout: Duration::from_millis(200),
            ..Default::default()
        })
        .unwrap();

        let err = engine
            .process_update_request(Bytes::from_static(b"<?xml?>"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Unavailable(_)));
    }
}
