//! Cache-aside layer
//!
//! Reads try the cache, fall back to storage, then populate the cache.
//! Writes go straight to storage and leave the cache alone.
//!
//! Nothing is ever invalidated. That is only correct because records are
//! immutable once written: if updates or deletes are ever added, cached
//! copies would go stale for as long as the cache keeps them.

use crate::error::Result;
use crate::record::Record;
use crate::storage::Storage;

use super::RecordCache;

/// Storage wrapped with an optional read cache
pub struct CachedStorage {
    storage: Box<dyn Storage>,
    cache: Option<Box<dyn RecordCache>>,
}

impl CachedStorage {
    pub fn new(storage: Box<dyn Storage>, cache: Option<Box<dyn RecordCache>>) -> Self {
        Self { storage, cache }
    }

    /// Pass-through with no cache
    pub fn uncached(storage: Box<dyn Storage>) -> Self {
        Self::new(storage, None)
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache.is_some()
    }
}

impl Storage for CachedStorage {
    fn set(&self, value: &str) -> Result<i64> {
        self.storage.set(value)
    }

    fn get(&self, id: i64) -> Result<Record> {
        let Some(cache) = &self.cache else {
            return self.storage.get(id);
        };

        match cache.get(id) {
            Ok(record) => {
                tracing::debug!(id, "Cache hit");
                return Ok(record);
            }
            Err(e) => tracing::debug!(id, reason = %e, "Cache lookup failed, reading storage"),
        }

        let record = self.storage.get(id)?;

        if let Err(e) = cache.set(id, &record) {
            tracing::warn!(id, error = %e, "Failed to populate cache");
        }

        Ok(record)
    }

    fn close(&self) -> Result<()> {
        self.storage.close()
    }
}
