use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, Query, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};

use super::{
    error::ApiError,
    models::{AutocompleteQuery, AutocompleteResponse, CodeRedQuery, HealthResponse, Suggestion},
    state::AppState,
    utils,
};
use crate::engine::{EngineError, ResolveError, VersionQuery};
use crate::telemetry::{self, EventLevel, TelemetryEvent, UPDATE_LOGGER, USAGE_STATS_LOGGER};

const UPDATE_CONTENT_TYPE: &str = "text/xml; charset=utf-8";
const ARTIFACT_CONTENT_TYPE: &str = "application/x-exe";

/// Update-check endpoint (POST /update)
///
/// Hands the raw body and the resolved client address to the protocol
/// engine and returns its output verbatim. A body the engine cannot parse
/// gets the fixed XML error document with status 400; the failure is logged
/// and reported to the error tracker.
pub async fn update(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    state.metrics.update_request();

    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let client_ip = utils::client_ip(&parts.headers, peer, &state.config.server.client_ip_headers);

    let body = utils::read_body_limited(body, state.config.server.max_body_bytes).await?;
    let body_len = body.len();

    match state.engine.process_update_request(body, client_ip).await {
        Ok(payload) => Ok(([(header::CONTENT_TYPE, UPDATE_CONTENT_TYPE)], payload).into_response()),
        Err(EngineError::MalformedRequest(reason)) => {
            state.metrics.malformed_update();

            let user_agent = parts
                .headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let client = client_ip.map(|ip| ip.to_string()).unwrap_or_default();

            error!(
                client_ip = %client,
                user_agent = %user_agent,
                uri = %parts.uri,
                body_len,
                reason = %reason,
                "Malformed update request"
            );

            let event = TelemetryEvent::new(EventLevel::Error, UPDATE_LOGGER, "Malformed update request")
                .with_extra("reason", reason)
                .with_extra("client_ip", client)
                .with_extra("user_agent", user_agent)
                .with_extra("uri", parts.uri.to_string())
                .with_extra("body_len", body_len);
            telemetry::dispatch(state.telemetry.clone(), state.metrics.clone(), event);

            Err(ApiError::MalformedUpdateRequest)
        }
        Err(e) => {
            error!(error = %e, body_len, "Update engine failed");
            Err(ApiError::Internal(e.to_string()))
        }
    }
}

/// Client identifier autocomplete (GET /userid-autocomplete)
///
/// Returns at most ten distinct identifiers for `app_id` that start with the
/// normalized `term`. `more` is always false.
pub async fn userid_autocomplete(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<AutocompleteResponse>, ApiError> {
    let query = AutocompleteQuery::from_params(utils::last_value_params(pairs));
    let prefix = utils::normalize_identifier_term(&query.term);

    let identifiers = state
        .identifiers
        .query_identifiers(&query.app_id, &prefix, utils::MAX_SUGGESTIONS)
        .await
        .map_err(|e| {
            error!(app_id = %query.app_id, prefix = %prefix, error = %e, "Identifier lookup failed");
            ApiError::from(e)
        })?;

    let results = utils::distinct_capped(identifiers, utils::MAX_SUGGESTIONS)
        .into_iter()
        .map(Suggestion::from_identifier)
        .collect();

    Ok(Json(AutocompleteResponse {
        results,
        more: false,
    }))
}

/// Usage statistics relay (GET|POST /usagestats)
///
/// The body goes to the telemetry sink in the background, tagged with the
/// query parameters. The caller always gets `ok`: a body over
/// `server.max_body_bytes` is forwarded truncated, and one that cannot be
/// read is forwarded as far as it got.
pub async fn usage_stats(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
    request: Request,
) -> impl IntoResponse {
    let tags = utils::last_value_params(pairs);
    let body = utils::read_body_prefix(request.into_body(), state.config.server.max_body_bytes).await;

    let mut event = TelemetryEvent::new(
        EventLevel::Info,
        USAGE_STATS_LOGGER,
        String::from_utf8_lossy(&body.bytes).into_owned(),
    )
    .with_tags(tags);
    if !body.complete {
        warn!(forwarded = body.bytes.len(), "Usage report truncated");
        event = event.with_extra("truncated", true);
    }

    telemetry::dispatch(state.telemetry.clone(), state.metrics.clone(), event);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.to_string())],
        "ok",
    )
}

/// Forced-update download (GET /codered)
///
/// Resolves the release for `appid` on the forced-update channel and streams
/// the installer from the artifact store.
pub async fn code_red(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let query = CodeRedQuery::from_params(utils::last_value_params(pairs));
    let version_query = VersionQuery::forced_update(
        query.appid,
        query.userid,
        state.config.forced_update.channel.clone(),
    );

    let record = match state.versions.resolve_version(&version_query).await {
        Ok(record) => record,
        Err(ResolveError::NotFound) => {
            info!(
                app_id = %version_query.app_id,
                channel = %version_query.channel,
                "No forced-update version for app"
            );
            return Err(ApiError::VersionNotFound);
        }
        Err(e) => {
            error!(app_id = %version_query.app_id, error = %e, "Version lookup failed");
            return Err(e.into());
        }
    };

    let artifact = state
        .fetcher
        .fetch(&record.file_absolute_url)
        .await
        .map_err(|e| {
            state.metrics.artifact_failed();
            error!(url = %record.file_absolute_url, error = %e, "Artifact fetch failed");
            ApiError::from(e)
        })?;

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ARTIFACT_CONTENT_TYPE)
        .header(
            header::CONTENT_DISPOSITION,
            utils::attachment_disposition(&record.file_package_name),
        );
    if let Some(len) = artifact.content_length() {
        response = response.header(header::CONTENT_LENGTH, len);
    }
    let source = artifact.url().to_string();

    let response = response.body(artifact.into_body()).map_err(|e| {
        warn!(package = %record.file_package_name, error = %e, "Invalid download headers");
        ApiError::Internal(e.to_string())
    })?;

    state.metrics.artifact_served();
    info!(
        app_id = %version_query.app_id,
        package = %record.file_package_name,
        %source,
        "Streaming forced-update artifact"
    );

    Ok(response)
}

/// Health check endpoint (GET /health)
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        counters: state.metrics.snapshot(),
    };

    (StatusCode::OK, Json(response))
}
