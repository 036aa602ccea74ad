//! API utility functions
//!
//! Pure, stateless helpers for request processing, kept apart from the
//! handlers so they can be unit tested.

use std::net::IpAddr;

use std::collections::BTreeMap;

use axum::http::HeaderMap;
use bytes::{Bytes, BytesMut};
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::api::error::ApiError;

/// Upper bound on identifier suggestions per lookup.
pub const MAX_SUGGESTIONS: usize = 10;

/// Canonical form of an identifier prefix: brace-led and upper-case.
///
/// `abc` becomes `{ABC`; `{xyz` becomes `{XYZ`.
pub fn normalize_identifier_term(term: &str) -> String {
    let term = if term.starts_with('{') {
        term.to_string()
    } else {
        format!("{{{term}")
    };
    term.to_uppercase()
}

/// Drops repeated identifiers (keeping first occurrence) and caps the list.
pub fn distinct_capped(identifiers: Vec<String>, cap: usize) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::with_capacity(identifiers.len().min(cap));
    for identifier in identifiers {
        if distinct.len() == cap {
            break;
        }
        if !distinct.contains(&identifier) {
            distinct.push(identifier);
        }
    }
    distinct
}

/// Resolves the originating client address.
///
/// Headers named in `trusted_headers` are checked in order; for list-valued
/// headers such as `X-Forwarded-For` the left-most parseable address wins.
/// Falls back to the socket peer.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    trusted_headers: &[String],
) -> Option<IpAddr> {
    trusted_headers
        .iter()
        .filter_map(|name| headers.get(name.as_str()))
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| {
            value
                .split(',')
                .map(str::trim)
                .find_map(|candidate| candidate.parse::<IpAddr>().ok())
        })
        .or(peer)
}

/// `attachment; filename=<name>`
pub fn attachment_disposition(filename: &str) -> String {
    format!("attachment; filename={filename}")
}

/// Reads a request body, refusing anything over `max_size` bytes.
pub async fn read_body_limited(body: axum::body::Body, max_size: usize) -> Result<Bytes, ApiError> {
    match Limited::new(body, max_size).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ApiError::PayloadTooLarge(max_size))
        }
        Err(err) => Err(ApiError::Internal(err.to_string())),
    }
}

/// Collapses query pairs into a map. A repeated key keeps its last value.
pub fn last_value_params(pairs: Vec<(String, String)>) -> BTreeMap<String, String> {
    pairs.into_iter().collect()
}

/// The leading bytes of a request body.
#[derive(Debug)]
pub struct BodyPrefix {
    pub bytes: Bytes,
    /// False when the body ran past the cap or failed part way through.
    pub complete: bool,
}

/// Reads at most `max_size` bytes of a body. Never fails: a body that cannot
/// be read (bad compression, client hang-up) yields whatever arrived before
/// the error.
pub async fn read_body_prefix(mut body: axum::body::Body, max_size: usize) -> BodyPrefix {
    let mut buf = BytesMut::new();

    while let Some(frame) = body.frame().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(error = %err, read = buf.len(), "Body read stopped early");
                return BodyPrefix {
                    bytes: buf.freeze(),
                    complete: false,
                };
            }
        };
        let Ok(data) = frame.into_data() else {
            continue;
        };

        let room = max_size - buf.len();
        if data.len() > room {
            buf.extend_from_slice(&data[..room]);
            return BodyPrefix {
                bytes: buf.freeze(),
                complete: false,
            };
        }
        buf.extend_from_slice(&data);
    }

    BodyPrefix {
        bytes: buf.freeze(),
        complete: true,
    }
}
