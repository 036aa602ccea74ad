//! Remote artifact fetching for the forced-update download proxy
//!
//! [`ArtifactFetcher::fetch`] returns as soon as the upstream status line and
//! headers arrive. The body is handed back as a stream so the caller can pipe
//! it chunk by chunk; dropping the stream aborts the upstream transfer.

use std::time::Duration;

use axum::body::Body;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    RequestFailed(String),

    #[error("upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    #[error("upstream timed out")]
    Timeout,

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("invalid artifact url: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Upstream client settings
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub connect_timeout: Duration,
    /// Bounds the whole transfer, body included.
    pub request_timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
            max_redirects: 10,
            user_agent: concat!("update-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// An upstream response whose body has not been read yet.
pub struct ArtifactStream {
    response: reqwest::Response,
}

impl ArtifactStream {
    /// Length announced by the upstream, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Final URL after redirects.
    pub fn url(&self) -> &str {
        self.response.url().as_str()
    }

    /// Response body that pulls from the upstream as the caller reads it.
    pub fn into_body(self) -> Body {
        Body::from_stream(self.response.bytes_stream())
    }
}

pub struct ArtifactFetcher {
    client: Client,
}

impl ArtifactFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self { client })
    }

    /// Start fetching `url`, following redirects. Non-2xx responses are errors.
    pub async fn fetch(&self, url: &str) -> Result<ArtifactStream> {
        let url = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        debug!(%url, "Starting artifact fetch");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_redirect() {
                FetchError::TooManyRedirects
            } else {
                FetchError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamStatus(status.as_u16()));
        }

        debug!(
            %url,
            final_url = %response.url(),
            size = ?response.content_length(),
            "Artifact upstream responded"
        );

        Ok(ArtifactStream { response })
    }
}
