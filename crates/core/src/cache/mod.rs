//! Named cache storage for intercepted requests.
//!
//! A cache provider holds any number of named caches, each mapping a
//! normalized request key to a stored response. Two providers exist:
//!
//! - [`CacheDb`]: persistent SQLite storage via tokio-rusqlite, with
//!   automatic schema migrations and WAL mode
//! - [`MemoryStorage`]: an in-process store for tests and ephemeral hosts

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryStorage;
pub use storage::{CacheStorage, CacheSummary, summarize};
