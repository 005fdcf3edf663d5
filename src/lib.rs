//! # recordvault
//!
//! A record store that hands out sequential ids:
//! - `set(name)` stores a record under the next id and returns the id
//! - `get(id)` returns the record, optionally through a read cache
//! - ids are never reused, across restarts and crashes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 TCP Server / Request handler                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                CachedStorage (cache-aside)                  │
//! │        reads: cache → storage → populate cache              │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐               ┌──────────────────┐
//!   │ Storage (trait) │               │ RecordCache      │
//!   │  KeyValue │ SQL │               │ memcached/memory │
//!   └────────┬────────┘               └──────────────────┘
//!            │ KeyValue
//!            ▼
//!   ┌─────────────────┐
//!   │     KvStore     │  WAL + MemTable + SSTables
//!   └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod codec;
pub mod record;

pub mod kv;
pub mod storage;
pub mod cache;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use cache::{CachedStorage, RecordCache};
pub use config::Config;
pub use error::{ErrorKind, Result, VaultError};
pub use record::Record;
pub use storage::{open_storage, Storage};

/// Open the configured storage engine behind the configured cache
pub fn open(config: &Config) -> Result<CachedStorage> {
    let storage = open_storage(config)?;
    let cache = cache::open_cache(&config.cache);
    Ok(CachedStorage::new(storage, cache))
}

// =============================================================================
// Version Info
// =============================================================================

/// Current version of recordvault
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
