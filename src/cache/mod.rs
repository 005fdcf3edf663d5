//! Read caches
//!
//! A [`RecordCache`] is an independently-addressed store of `(id, Record)`
//! copies. It is never a source of truth: [`CachedStorage`] consults it on
//! reads and swallows every error it returns.

mod aside;
mod memcache;
mod memory;

pub use aside::CachedStorage;
pub use memcache::{MemcacheCache, MAX_VALUE_SIZE};
pub use memory::MemoryCache;

use std::time::Duration;

use thiserror::Error;

use crate::config::{CacheConfig, CacheKind};
use crate::record::Record;

/// Failures of a cache call. Never fatal to a request.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache miss")]
    Miss,

    #[error("cache unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("cache value could not be (de)serialized: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("cache protocol error: {0}")]
    Protocol(String),
}

/// Contract for cache backends
pub trait RecordCache: Send + Sync {
    /// Store a copy of `record` under `id`
    fn set(&self, id: i64, record: &Record) -> Result<(), CacheError>;

    /// Fetch the copy stored under `id`; absent is [`CacheError::Miss`]
    fn get(&self, id: i64) -> Result<Record, CacheError>;
}

/// Build the configured cache, or `None` when caching is disabled
///
/// An unreachable memcached server is not an error: the cache is returned
/// anyway and reconnects on later calls.
pub fn open_cache(config: &CacheConfig) -> Option<Box<dyn RecordCache>> {
    if !config.enabled {
        tracing::info!("Cache disabled");
        return None;
    }

    match config.kind {
        CacheKind::Memcache => {
            let cache =
                MemcacheCache::new(&config.memcache_addr, Duration::from_millis(config.timeout_ms));
            match cache.ping() {
                Ok(version) => tracing::info!(
                    server = %config.memcache_addr,
                    %version,
                    "Connected to memcached"
                ),
                Err(e) => tracing::warn!(
                    server = %config.memcache_addr,
                    error = %e,
                    "memcached unreachable, reads fall back to storage until it answers"
                ),
            }
            Some(Box::new(cache))
        }
        CacheKind::Memory => {
            tracing::info!(capacity = config.memory_capacity, "Using in-process cache");
            Some(Box::new(MemoryCache::new(config.memory_capacity)))
        }
    }
}
