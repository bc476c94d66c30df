//! cache_list tool implementation.
//!
//! Lists every cache in storage, current or not.

use cove_client::Worker;
use cove_core::{CacheNames, cache::{CacheSummary, summarize}};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;

use super::super::json_result;

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheListOutput {
    pub caches: Vec<CacheSummary>,
    pub current: CacheNames,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let caches = summarize(worker.storage().as_ref()).await?;
    let output = CacheListOutput { caches, current: worker.cache_names().clone() };
    Ok(json_result(&output))
}
