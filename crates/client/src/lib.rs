//! Client code for the Caffeine Cove asset worker.
//!
//! This crate provides the network transport, the request classifier and
//! caching strategies, the worker lifecycle, and image loading helpers.

pub mod fetch;
pub mod images;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network};
pub use images::{PreloadReport, optimized_image_src, preload_images};
pub use worker::{FetchOutcome, Lifecycle, ResponseSource, Route, Strategy, Worker, WorkerStatus, classify};
