//! The cache provider abstraction injected into the worker.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AssetRequest, AssetResponse, Error};

/// A store of named request/response caches.
///
/// Individual operations are atomic. Nothing expires by age and no size bound
/// applies; entries leave a cache only when the whole cache is deleted or the
/// same key is overwritten.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open (creating if absent) the named cache.
    async fn open(&self, name: &str) -> Result<(), Error>;

    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// All cache names in creation order.
    async fn names(&self) -> Result<Vec<String>, Error>;

    /// Delete a cache and every entry in it. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Store a response, replacing any entry with the same key.
    ///
    /// Opens the cache if needed. Only `GET` requests can be stored.
    async fn put(&self, name: &str, request: &AssetRequest, response: &AssetResponse) -> Result<(), Error>;

    /// Store a batch of entries; either all are written or none are.
    async fn put_all(&self, name: &str, entries: Vec<(AssetRequest, AssetResponse)>) -> Result<(), Error>;

    /// Look a request up in one cache.
    async fn match_in(&self, name: &str, request: &AssetRequest) -> Result<Option<AssetResponse>, Error>;

    /// Look a request up in every cache, in creation order; first hit wins.
    async fn match_any(&self, request: &AssetRequest) -> Result<Option<AssetResponse>, Error>;

    /// URLs of the entries stored in a cache, in insertion order.
    async fn keys(&self, name: &str) -> Result<Vec<String>, Error>;
}

/// Reject requests that the cache cannot hold.
pub(crate) fn ensure_storable(request: &AssetRequest) -> Result<(), Error> {
    if request.is_get() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("cannot cache {} request for {}", request.method, request.url)))
    }
}

/// A cache name with its entry count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheSummary {
    pub name: String,
    pub entries: usize,
}

/// Summarize every cache held by a provider, in creation order.
pub async fn summarize(storage: &dyn CacheStorage) -> Result<Vec<CacheSummary>, Error> {
    let mut summaries = Vec::new();
    for name in storage.names().await? {
        let entries = storage.keys(&name).await?.len();
        summaries.push(CacheSummary { name, entries });
    }
    Ok(summaries)
}
