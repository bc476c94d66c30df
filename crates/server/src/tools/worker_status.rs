//! worker_status tool implementation.

use cove_client::Worker;
use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::json_result;

/// Implementation of the worker_status tool.
pub async fn status_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    Ok(json_result(&worker.status().await))
}
