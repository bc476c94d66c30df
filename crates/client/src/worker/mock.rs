//! Scripted network for worker tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use cove_core::{AssetRequest, AssetResponse, Error};
use tokio::sync::Notify;

use crate::fetch::Network;

/// Serves scripted bodies by path and records every call.
///
/// Unknown paths answer 404. While offline every call fails with a
/// transport error. With a gate set, each call waits for one permit.
#[derive(Default)]
pub struct MockNetwork {
    routes: Mutex<HashMap<String, (u16, Bytes)>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, path: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, Bytes::copy_from_slice(body.as_bytes())));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|p| *p == path).count()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, Error> {
        let path = request.path().to_string();
        self.calls.lock().unwrap().push(path.clone());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: connection refused", request.url)));
        }

        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(&path)
            .cloned()
            .unwrap_or((404, Bytes::from_static(b"not found")));

        Ok(AssetResponse {
            url: request.url.to_string(),
            status,
            status_text: if status == 200 { "OK".into() } else { String::new() },
            headers: vec![("content-type".into(), "text/plain".into())],
            body,
        })
    }
}
