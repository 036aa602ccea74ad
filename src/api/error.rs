use axum::{
    Json,
    http::{StatusCode, header},
    response::IntoResponse,
};
use thiserror::Error;

use super::models::ErrorResponse;
use crate::artifact::FetchError;
use crate::engine::{ResolveError, StoreError};

/// Body sent to update clients whose request could not be parsed. Existing
/// clients expect it byte for byte, served as `text/html`.
pub const BAD_REQUEST_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<data>
    <message>
        Bad Request
    </message>
</data>"#;

pub const VERSION_NOT_FOUND_BODY: &str = "Error: Version does not exist";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("malformed update request")]
    MalformedUpdateRequest,
    #[error("{}", VERSION_NOT_FOUND_BODY)]
    VersionNotFound,
    #[error("payload exceeds {0} bytes")]
    PayloadTooLarge(usize),
    #[error("CSRF verification failed")]
    CsrfRejected,
    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(String),
    #[error("upstream fetch timed out")]
    UpstreamTimeout,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedUpdateRequest => StatusCode::BAD_REQUEST,
            ApiError::VersionNotFound => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::CsrfRejected => StatusCode::FORBIDDEN,
            ApiError::UpstreamFetch(_) => StatusCode::BAD_GATEWAY,
            ApiError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MalformedUpdateRequest => "MALFORMED_UPDATE_REQUEST",
            ApiError::VersionNotFound => "VERSION_NOT_FOUND",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::CsrfRejected => "CSRF_REJECTED",
            ApiError::UpstreamFetch(_) => "UPSTREAM_FETCH_FAILED",
            ApiError::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message shown to callers. Infrastructure details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::UpstreamFetch(_) => "upstream fetch failed".to_string(),
            ApiError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();

        match self {
            ApiError::MalformedUpdateRequest => (
                status,
                [(header::CONTENT_TYPE, mime::TEXT_HTML_UTF_8.as_ref())],
                BAD_REQUEST_XML,
            )
                .into_response(),
            ApiError::VersionNotFound => (
                status,
                [(header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref())],
                VERSION_NOT_FOUND_BODY,
            )
                .into_response(),
            other => {
                let body = ErrorResponse {
                    code: other.code(),
                    message: other.public_message(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(value: FetchError) -> Self {
        match value {
            FetchError::Timeout => ApiError::UpstreamTimeout,
            other => ApiError::UpstreamFetch(other.to_string()),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::NotFound => ApiError::VersionNotFound,
            ResolveError::Backend(reason) => ApiError::Internal(reason),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        ApiError::Internal(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn malformed_update_renders_fixed_xml_as_html() {
        let response = ApiError::MalformedUpdateRequest.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        assert_eq!(body_string(response).await, BAD_REQUEST_XML);
    }

    #[tokio::test]
    async fn internal_details_are_not_exposed() {
        let response = ApiError::Internal("db password wrong".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(response).await;
        assert!(!body.contains("password"));
        assert!(body.contains("INTERNAL_ERROR"));
    }

    #[test]
    fn fetch_errors_map_to_gateway_statuses() {
        assert_eq!(
            ApiError::from(FetchError::Timeout).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::from(FetchError::UpstreamStatus(503)).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert!(matches!(
            ApiError::from(ResolveError::NotFound),
            ApiError::VersionNotFound
        ));
    }
}
