//! cache_get tool implementation.
//!
//! Retrieves a cached response by URL without touching the network.

use cove_client::Worker;
use cove_core::{Error, cache::hash::body_digest};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::{body_text, json_result};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Root-relative path or absolute URL of the cached request.
    pub url: String,

    /// Cache name to search; every cache is searched when omitted.
    #[serde(default)]
    pub cache: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheGetOutput {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    pub body_sha256: String,
    pub text: Option<String>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &Worker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let request = worker.request(&params.url)?;
    let storage = worker.storage();

    let cached = match &params.cache {
        Some(name) => storage.match_in(name, &request).await?,
        None => storage.match_any(&request).await?,
    };
    let response = cached.ok_or_else(|| Error::CacheMiss(request.url.to_string()))?;

    let output = CacheGetOutput {
        url: response.url.clone(),
        status: response.status,
        body_len: response.body.len(),
        body_sha256: body_digest(&response.body),
        text: body_text(&response.body),
        headers: response.headers,
    };

    Ok(json_result(&output))
}
