//! Request and response shapes for the gateway endpoints.
//!
//! Query parameters are all optional and default to empty strings; the
//! legacy agents calling these endpoints omit or repeat them freely. A
//! repeated parameter takes its last value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::observability::MetricsSnapshot;

/// `GET /userid-autocomplete?term=&app_id=`
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AutocompleteQuery {
    pub term: String,
    pub app_id: String,
}

impl AutocompleteQuery {
    pub fn from_params(mut params: BTreeMap<String, String>) -> Self {
        Self {
            term: params.remove("term").unwrap_or_default(),
            app_id: params.remove("app_id").unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub id: String,
}

impl Suggestion {
    pub fn from_identifier(identifier: String) -> Self {
        Self {
            text: identifier.clone(),
            id: identifier,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    pub results: Vec<Suggestion>,
    /// Pagination beyond the first page is not implemented; always false.
    pub more: bool,
}

/// `GET /codered?appid=&userid=`
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CodeRedQuery {
    pub appid: String,
    pub userid: String,
}

impl CodeRedQuery {
    pub fn from_params(mut params: BTreeMap<String, String>) -> Self {
        Self {
            appid: params.remove("appid").unwrap_or_default(),
            userid: params.remove("userid").unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub counters: MetricsSnapshot,
}
