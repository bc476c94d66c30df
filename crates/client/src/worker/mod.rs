//! The offline asset cache worker.
//!
//! Lifecycle: `Parsed → Installing → Installed → Activating → Activated`,
//! or `Redundant` when install fails. Until it is activated the worker takes
//! no action on fetches and they go straight to the network.
//!
//! Once activated, every request is classified and answered by one of three
//! strategies:
//!
//! | Route | Strategy               | Cache  |
//! |-------|------------------------|--------|
//! | Icon  | cache-first            | icons  |
//! | Image | stale-while-revalidate | images |
//! | Other | network-first          | any    |
//!
//! Concurrent requests for the same key are not coalesced.

mod classify;
mod strategy;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;
use std::sync::Arc;

use cove_core::{
    AppConfig, AssetRequest, AssetResponse, CacheNames, CacheStorage, Destination, Error, InstallPolicy, Manifest,
};
use futures_util::future::{join_all, try_join_all};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use url::Url;

pub use classify::{Route, Strategy, classify};
pub use strategy::{FetchOutcome, ResponseSource, cache_first, network_first, passthrough, stale_while_revalidate};

use crate::fetch::{Network, canonicalize};

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifecycle::Parsed => "parsed",
            Lifecycle::Installing => "installing",
            Lifecycle::Installed => "installed",
            Lifecycle::Activating => "activating",
            Lifecycle::Activated => "activated",
            Lifecycle::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Snapshot of the worker for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub state: Lifecycle,
    pub origin: String,
    pub caches: CacheNames,
    pub install_policy: InstallPolicy,
}

/// Intercepts page requests and serves them from the network, the caches, or both.
pub struct Worker {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    origin: Url,
    names: CacheNames,
    manifest: Manifest,
    policy: InstallPolicy,
    state: RwLock<Lifecycle>,
    refreshes: Mutex<Vec<JoinHandle<()>>>,
}

impl Worker {
    /// A worker with the default cache names, manifest and install policy.
    pub fn new(storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, origin: Url) -> Self {
        Self {
            storage,
            network,
            origin,
            names: CacheNames::default(),
            manifest: Manifest::default(),
            policy: InstallPolicy::default(),
            state: RwLock::new(Lifecycle::Parsed),
            refreshes: Mutex::new(Vec::new()),
        }
    }

    /// Build a worker from loaded configuration.
    pub fn from_config(
        config: &AppConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>,
    ) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        Ok(Self::new(storage, network, origin)
            .with_cache_names(config.cache_names())
            .with_install_policy(config.install_policy))
    }

    pub fn with_cache_names(mut self, names: CacheNames) -> Self {
        self.names = names;
        self
    }

    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_install_policy(mut self, policy: InstallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn cache_names(&self) -> &CacheNames {
        &self.names
    }

    pub async fn state(&self) -> Lifecycle {
        *self.state.read().await
    }

    pub async fn status(&self) -> WorkerStatus {
        WorkerStatus {
            state: self.state().await,
            origin: self.origin.to_string(),
            caches: self.names.clone(),
            install_policy: self.policy,
        }
    }

    /// Build a `GET` request for a root-relative path or absolute URL.
    pub fn request(&self, input: &str) -> Result<AssetRequest, Error> {
        let url = canonicalize(&self.origin, input).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(AssetRequest::get(url))
    }

    async fn transition(&self, from: Lifecycle, to: Lifecycle) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if *state != from {
            return Err(Error::InvalidState(format!("cannot move to {to} from {}", *state)));
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: Lifecycle) {
        *self.state.write().await = to;
    }

    /// Open the three caches and populate them with their critical assets.
    ///
    /// On failure the worker becomes `Redundant` and the error is returned.
    pub async fn install(&self) -> Result<(), Error> {
        self.transition(Lifecycle::Parsed, Lifecycle::Installing).await?;
        tracing::info!(policy = ?self.policy, "installing");

        let result = tokio::try_join!(
            self.populate(&self.names.general, &self.manifest.critical_assets, Destination::Empty),
            self.populate(&self.names.images, &self.manifest.critical_images, Destination::Image),
            self.populate(&self.names.icons, &self.manifest.icon_assets, Destination::Empty),
        );

        match result {
            Ok(_) => {
                self.set_state(Lifecycle::Installed).await;
                tracing::info!("installed; skipping wait for activation");
                Ok(())
            }
            Err(e) => {
                self.set_state(Lifecycle::Redundant).await;
                tracing::warn!(error = %e, "install failed");
                Err(e)
            }
        }
    }

    async fn populate(&self, cache: &str, paths: &[String], destination: Destination) -> Result<(), Error> {
        self.storage.open(cache).await?;
        let requests = paths
            .iter()
            .map(|p| self.request(p).map(|r| r.with_destination(destination)))
            .collect::<Result<Vec<_>, _>>()?;

        match self.policy {
            InstallPolicy::AllOrNothing => {
                let entries = try_join_all(requests.into_iter().map(|r| self.fetch_critical(r))).await?;
                let count = entries.len();
                self.storage.put_all(cache, entries).await?;
                tracing::info!(cache, count, "cached critical assets");
            }
            InstallPolicy::BestEffort => {
                let results = join_all(requests.into_iter().map(|r| self.fetch_critical(r))).await;
                let mut stored = 0usize;
                for result in results {
                    match result {
                        Ok((request, response)) => {
                            self.storage.put(cache, &request, &response).await?;
                            stored += 1;
                        }
                        Err(e) => tracing::warn!(cache, error = %e, "skipping critical asset"),
                    }
                }
                tracing::info!(cache, stored, total = paths.len(), "cached critical assets");
            }
        }
        Ok(())
    }

    async fn fetch_critical(&self, request: AssetRequest) -> Result<(AssetRequest, AssetResponse), Error> {
        match self.network.fetch(&request).await {
            Ok(response) if response.ok() => Ok((request, response)),
            Ok(response) => Err(Error::InstallFailed(format!("{}: status {}", request.url, response.status))),
            Err(e) => Err(Error::InstallFailed(format!("{}: {e}", request.url))),
        }
    }

    /// Delete every cache that is not current, then take control of fetches.
    ///
    /// Returns the names of the deleted caches.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.transition(Lifecycle::Installed, Lifecycle::Activating).await?;

        match self.purge_stale().await {
            Ok(deleted) => {
                self.set_state(Lifecycle::Activated).await;
                tracing::info!(deleted = deleted.len(), "activated; claimed clients");
                Ok(deleted)
            }
            Err(e) => {
                self.set_state(Lifecycle::Installed).await;
                Err(e)
            }
        }
    }

    async fn purge_stale(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.storage.names().await? {
            if !self.names.is_current(&name) && self.storage.delete(&name).await? {
                tracing::info!(cache = %name, "deleted stale cache");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Install then activate.
    pub async fn start(&self) -> Result<Vec<String>, Error> {
        self.install().await?;
        self.activate().await
    }

    /// Answer one intercepted request.
    pub async fn handle_fetch(&self, request: &AssetRequest) -> Result<FetchOutcome, Error> {
        if self.state().await != Lifecycle::Activated {
            tracing::debug!(url = %request.url, "not in control, passing through");
            return passthrough(self.network.as_ref(), request).await;
        }

        let route = classify(request, &self.manifest);
        let strategy = route.strategy();
        tracing::debug!(url = %request.url, ?route, ?strategy, "handling fetch");

        match strategy {
            Strategy::CacheFirst => {
                cache_first(self.storage.as_ref(), self.network.as_ref(), self.cache_for(route), request).await
            }
            Strategy::StaleWhileRevalidate => {
                let (outcome, refresh) = stale_while_revalidate(
                    Arc::clone(&self.storage),
                    Arc::clone(&self.network),
                    self.cache_for(route),
                    request,
                )
                .await?;
                if let Some(handle) = refresh {
                    let mut refreshes = self.refreshes.lock().await;
                    refreshes.retain(|h| !h.is_finished());
                    refreshes.push(handle);
                }
                Ok(outcome)
            }
            Strategy::NetworkFirst => network_first(self.storage.as_ref(), self.network.as_ref(), request).await,
            Strategy::Passthrough => passthrough(self.network.as_ref(), request).await,
        }
    }

    /// Cache that stores responses for a route.
    fn cache_for(&self, route: Route) -> &str {
        match route {
            Route::Icon => &self.names.icons,
            Route::Image => &self.names.images,
            Route::Other => &self.names.general,
        }
    }

    /// Wait for every outstanding background refresh. Returns how many were awaited.
    pub async fn settle(&self) -> usize {
        let handles = std::mem::take(&mut *self.refreshes.lock().await);
        let count = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "background refresh aborted");
            }
        }
        count
    }
}
