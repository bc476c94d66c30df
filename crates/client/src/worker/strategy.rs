//! Strategy executors: cache-first, stale-while-revalidate, network-first.
//!
//! Writes to a cache are opportunistic. A failed write is logged and the
//! response is still returned; only `GET` requests with a 2xx response are
//! ever stored.

use std::sync::Arc;

use cove_core::{AssetRequest, AssetResponse, CacheStorage, Error};
use serde::Serialize;
use tokio::task::JoinHandle;

use super::classify::Strategy;
use crate::fetch::Network;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
}

/// A response together with how it was produced.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: AssetResponse,
    pub source: ResponseSource,
    pub strategy: Strategy,
}

impl FetchOutcome {
    fn new(response: AssetResponse, source: ResponseSource, strategy: Strategy) -> Self {
        Self { response, source, strategy }
    }
}

async fn store_copy(storage: &dyn CacheStorage, cache: &str, request: &AssetRequest, response: &AssetResponse) {
    if !request.is_get() || !response.ok() {
        return;
    }
    if let Err(e) = storage.put(cache, request, response).await {
        tracing::warn!(cache, url = %request.url, error = %e, "failed to store response");
    }
}

/// Network only; the worker is not in control.
pub async fn passthrough(network: &dyn Network, request: &AssetRequest) -> Result<FetchOutcome, Error> {
    let response = network.fetch(request).await?;
    Ok(FetchOutcome::new(response, ResponseSource::Network, Strategy::Passthrough))
}

/// Serve from `cache` when present; otherwise fetch, keep a copy, and return.
pub async fn cache_first(
    storage: &dyn CacheStorage, network: &dyn Network, cache: &str, request: &AssetRequest,
) -> Result<FetchOutcome, Error> {
    if let Some(cached) = storage.match_in(cache, request).await? {
        tracing::debug!(cache, url = %request.url, "cache hit");
        return Ok(FetchOutcome::new(cached, ResponseSource::Cache, Strategy::CacheFirst));
    }

    let response = network.fetch(request).await?;
    store_copy(storage, cache, request, &response).await;
    Ok(FetchOutcome::new(response, ResponseSource::Network, Strategy::CacheFirst))
}

/// Serve from `cache` immediately and refresh the entry in the background.
///
/// On a miss this behaves like [`cache_first`]. The refresh task's failures
/// are swallowed; its handle is returned so the caller can await it later.
pub async fn stale_while_revalidate(
    storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, cache: &str, request: &AssetRequest,
) -> Result<(FetchOutcome, Option<JoinHandle<()>>), Error> {
    if let Some(cached) = storage.match_in(cache, request).await? {
        tracing::debug!(cache, url = %request.url, "cache hit, revalidating");
        let refresh = tokio::spawn(revalidate(storage, network, cache.to_string(), request.clone()));
        return Ok((FetchOutcome::new(cached, ResponseSource::Cache, Strategy::StaleWhileRevalidate), Some(refresh)));
    }

    let response = network.fetch(request).await?;
    store_copy(storage.as_ref(), cache, request, &response).await;
    Ok((FetchOutcome::new(response, ResponseSource::Network, Strategy::StaleWhileRevalidate), None))
}

async fn revalidate(storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, cache: String, request: AssetRequest) {
    match network.fetch(&request).await {
        Ok(fresh) if fresh.ok() => {
            if let Err(e) = storage.put(&cache, &request, &fresh).await {
                tracing::debug!(url = %request.url, error = %e, "background refresh not stored");
            }
        }
        Ok(fresh) => tracing::debug!(url = %request.url, status = fresh.status, "background refresh not ok"),
        Err(e) => tracing::debug!(url = %request.url, error = %e, "background refresh failed"),
    }
}

/// Try the network; on a transport failure fall back to any cache.
pub async fn network_first(
    storage: &dyn CacheStorage, network: &dyn Network, request: &AssetRequest,
) -> Result<FetchOutcome, Error> {
    match network.fetch(request).await {
        Ok(response) => Ok(FetchOutcome::new(response, ResponseSource::Network, Strategy::NetworkFirst)),
        Err(err) => {
            tracing::debug!(url = %request.url, error = %err, "network failed, trying caches");
            match storage.match_any(request).await? {
                Some(cached) => Ok(FetchOutcome::new(cached, ResponseSource::Cache, Strategy::NetworkFirst)),
                None => Err(Error::Offline(format!("{} ({err})", request.url))),
            }
        }
    }
}
