//! asset_fetch tool implementation.
//!
//! Runs a request through the worker as if the page had issued it.

use cove_client::{ResponseSource, Strategy, Worker};
use cove_core::{Destination, Error, cache::hash::body_digest};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{body_text, json_result};

/// Input parameters for asset_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssetFetchParams {
    /// Root-relative path (e.g. "/src/assets/logo.png") or absolute URL.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Declared request destination, e.g. "image" or "document".
    #[serde(default)]
    pub destination: Destination,
}

fn default_method() -> String {
    "GET".into()
}

/// HTTP method token: one or more `tchar` per RFC 9110.
fn is_method_token(method: &str) -> bool {
    !method.is_empty()
        && method
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

/// Output structure for asset_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct AssetFetchOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub source: ResponseSource,
    pub strategy: Strategy,
    pub content_type: Option<String>,
    pub body_len: usize,
    pub body_sha256: String,
    /// Body text (only if valid UTF-8).
    pub text: Option<String>,
}

/// Implementation of the asset_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: AssetFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }
    if !is_method_token(&params.method) {
        return Err(Error::InvalidInput(format!("invalid method: {:?}", params.method)).into());
    }

    let request = worker
        .request(&params.url)?
        .with_method(&params.method)
        .with_destination(params.destination);

    let outcome = worker.handle_fetch(&request).await?;
    let response = outcome.response;

    let output = AssetFetchOutput {
        url: response.url.clone(),
        status: response.status,
        status_text: response.status_text.clone(),
        source: outcome.source,
        strategy: outcome.strategy,
        content_type: response.content_type().map(str::to_string),
        body_len: response.body.len(),
        body_sha256: body_digest(&response.body),
        text: body_text(&response.body),
    };

    Ok(json_result(&output))
}
