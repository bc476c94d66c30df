//! Image loading helpers: bulk preloading through the worker and WebP source selection.

use cove_core::{Destination, Error};
use futures_util::future::join_all;
use serde::Serialize;

use crate::worker::Worker;

/// Result of a preload pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreloadReport {
    pub loaded: Vec<String>,
    /// (source, reason)
    pub failed: Vec<(String, String)>,
}

async fn preload_one(worker: &Worker, src: &str) -> Result<(), Error> {
    let request = worker.request(src)?.with_destination(Destination::Image);
    let outcome = worker.handle_fetch(&request).await?;
    if outcome.response.ok() {
        Ok(())
    } else {
        Err(Error::Network(format!("status {}", outcome.response.status)))
    }
}

/// Request every source as an image, concurrently.
///
/// Failures never abort the pass; they are collected and logged once.
pub async fn preload_images(worker: &Worker, sources: &[&str]) -> PreloadReport {
    let results = join_all(sources.iter().map(|src| preload_one(worker, src))).await;

    let mut report = PreloadReport::default();
    for (src, result) in sources.iter().zip(results) {
        match result {
            Ok(()) => report.loaded.push(src.to_string()),
            Err(e) => report.failed.push((src.to_string(), e.to_string())),
        }
    }

    if !report.failed.is_empty() {
        tracing::warn!(failed = report.failed.len(), total = sources.len(), "some images failed to preload");
    }
    report
}

/// Prefer the `.webp` sibling of a `.jpg` source when the client supports WebP.
pub fn optimized_image_src(src: &str, webp_supported: bool) -> String {
    if webp_supported && src.contains(".jpg") {
        src.replacen(".jpg", ".webp", 1)
    } else {
        src.to_string()
    }
}
