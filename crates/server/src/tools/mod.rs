//! MCP tool implementations.
//!
//! This module contains all tools exposed by the cove-worker server.

pub mod asset_fetch;
pub mod cache;
pub mod worker_status;

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> CallToolResult {
    CallToolResult::success(vec![Content::text(serde_json::to_string_pretty(output).unwrap_or_default())])
}

/// Body as text when it is valid UTF-8.
pub(crate) fn body_text(body: &[u8]) -> Option<String> {
    std::str::from_utf8(body).ok().map(str::to_string)
}
