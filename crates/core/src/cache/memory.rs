//! In-process cache provider.
//!
//! Uses an ordered list of caches behind a tokio RwLock, so every operation
//! holds the lock for exactly one read or write.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::storage::{CacheStorage, ensure_storable};
use crate::{AssetRequest, AssetResponse, Error};

#[derive(Debug)]
struct NamedCache {
    name: String,
    entries: Vec<(String, String, AssetResponse)>,
}

impl NamedCache {
    fn new(name: &str) -> Self {
        Self { name: name.to_string(), entries: Vec::new() }
    }

    fn insert(&mut self, key: String, url: String, response: AssetResponse) {
        match self.entries.iter_mut().find(|(k, _, _)| *k == key) {
            Some(slot) => *slot = (key, url, response),
            None => self.entries.push((key, url, response)),
        }
    }

    fn get(&self, key: &str) -> Option<&AssetResponse> {
        self.entries.iter().find(|(k, _, _)| k == key).map(|(_, _, r)| r)
    }
}

/// Named caches held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    caches: RwLock<Vec<NamedCache>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn position(caches: &[NamedCache], name: &str) -> Option<usize> {
    caches.iter().position(|c| c.name == name)
}

fn open_mut<'a>(caches: &'a mut Vec<NamedCache>, name: &str) -> &'a mut NamedCache {
    let idx = match position(caches, name) {
        Some(idx) => idx,
        None => {
            caches.push(NamedCache::new(name));
            caches.len() - 1
        }
    };
    &mut caches[idx]
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let mut caches = self.caches.write().await;
        open_mut(&mut caches, name);
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        Ok(position(&self.caches.read().await, name).is_some())
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        Ok(self.caches.read().await.iter().map(|c| c.name.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut caches = self.caches.write().await;
        match position(&caches, name) {
            Some(idx) => {
                caches.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn put(&self, name: &str, request: &AssetRequest, response: &AssetResponse) -> Result<(), Error> {
        ensure_storable(request)?;
        let mut caches = self.caches.write().await;
        open_mut(&mut caches, name).insert(request.cache_key(), request.cache_url(), response.clone());
        Ok(())
    }

    async fn put_all(&self, name: &str, entries: Vec<(AssetRequest, AssetResponse)>) -> Result<(), Error> {
        for (request, _) in &entries {
            ensure_storable(request)?;
        }
        let mut caches = self.caches.write().await;
        let cache = open_mut(&mut caches, name);
        for (request, response) in entries {
            cache.insert(request.cache_key(), request.cache_url(), response);
        }
        Ok(())
    }

    async fn match_in(&self, name: &str, request: &AssetRequest) -> Result<Option<AssetResponse>, Error> {
        let caches = self.caches.read().await;
        let key = request.cache_key();
        Ok(caches
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.get(&key))
            .cloned())
    }

    async fn match_any(&self, request: &AssetRequest) -> Result<Option<AssetResponse>, Error> {
        let caches = self.caches.read().await;
        let key = request.cache_key();
        Ok(caches.iter().find_map(|c| c.get(&key)).cloned())
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>, Error> {
        let caches = self.caches.read().await;
        Ok(caches
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.entries.iter().map(|(_, url, _)| url.clone()).collect())
            .unwrap_or_default())
    }
}
