//! Core types and shared functionality for the Caffeine Cove asset worker.
//!
//! This crate provides:
//! - Named cache storage (SQLite and in-memory backends)
//! - Request/response model and request key hashing
//! - Cache naming and the critical asset manifest
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod request;

pub use cache::{CacheDb, CacheStorage, MemoryStorage};
pub use config::AppConfig;
pub use error::Error;
pub use manifest::{CacheNames, InstallPolicy, Manifest};
pub use request::{AssetRequest, AssetResponse, Destination};
