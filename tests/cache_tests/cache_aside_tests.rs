//! Tests for the cache-aside layer
//!
//! These tests verify:
//! - Reads are served from the cache when it has the record
//! - Misses fall through to storage and populate the cache
//! - Cache failures never surface to the caller
//! - Writes never touch the cache

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use recordvault::cache::{CacheError, MemoryCache, RecordCache};
use recordvault::{CachedStorage, Record, Result, Storage, VaultError};

// =============================================================================
// Test Doubles
// =============================================================================

/// In-memory storage that counts reads
#[derive(Default)]
struct CountingStorage {
    names: Mutex<Vec<String>>,
    gets: AtomicUsize,
}

impl Storage for CountingStorage {
    fn set(&self, value: &str) -> Result<i64> {
        let mut names = self.names.lock();
        names.push(value.to_string());
        Ok(names.len() as i64)
    }

    fn get(&self, id: i64) -> Result<Record> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let names = self.names.lock();
        usize::try_from(id - 1)
            .ok()
            .and_then(|i| names.get(i))
            .map(|name| Record::new(id, name.clone()))
            .ok_or(VaultError::NotFound { id })
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct SharedStorage(Arc<CountingStorage>);

impl Storage for SharedStorage {
    fn set(&self, value: &str) -> Result<i64> {
        self.0.set(value)
    }
    fn get(&self, id: i64) -> Result<Record> {
        self.0.get(id)
    }
    fn close(&self) -> Result<()> {
        self.0.close()
    }
}

struct SharedCache(Arc<MemoryCache>);

impl RecordCache for SharedCache {
    fn set(&self, id: i64, record: &Record) -> std::result::Result<(), CacheError> {
        self.0.set(id, record)
    }
    fn get(&self, id: i64) -> std::result::Result<Record, CacheError> {
        self.0.get(id)
    }
}

/// A cache whose every call fails
struct BrokenCache;

impl RecordCache for BrokenCache {
    fn set(&self, _id: i64, _record: &Record) -> std::result::Result<(), CacheError> {
        Err(CacheError::Protocol("set rejected".to_string()))
    }
    fn get(&self, _id: i64) -> std::result::Result<Record, CacheError> {
        Err(CacheError::Unavailable(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "down",
        )))
    }
}

fn setup() -> (CachedStorage, Arc<CountingStorage>, Arc<MemoryCache>) {
    let storage = Arc::new(CountingStorage::default());
    let cache = Arc::new(MemoryCache::new(100));
    let cached = CachedStorage::new(
        Box::new(SharedStorage(Arc::clone(&storage))),
        Some(Box::new(SharedCache(Arc::clone(&cache)))),
    );
    (cached, storage, cache)
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_miss_populates_then_hits() {
    let (cached, storage, cache) = setup();
    let id = cached.set("alice").unwrap();

    assert_eq!(cached.get(id).unwrap(), Record::new(id, "alice"));
    assert!(cache.contains(id));
    assert_eq!(cached.get(id).unwrap(), Record::new(id, "alice"));

    assert_eq!(storage.gets.load(Ordering::SeqCst), 1);
}

#[test]
fn test_set_does_not_write_cache() {
    let (cached, _storage, cache) = setup();
    let id = cached.set("alice").unwrap();

    assert!(!cache.contains(id));
    assert!(cache.is_empty());
}

#[test]
fn test_cached_copy_wins() {
    let (cached, storage, cache) = setup();
    let id = cached.set("alice").unwrap();
    cache.set(id, &Record::new(id, "from-cache")).unwrap();

    assert_eq!(cached.get(id).unwrap().name, "from-cache");
    assert_eq!(storage.gets.load(Ordering::SeqCst), 0);
}

#[test]
fn test_not_found_is_not_cached() {
    let (cached, _storage, cache) = setup();

    let err = cached.get(7).unwrap_err();
    assert!(err.is_not_found());
    assert!(cache.is_empty());
}

#[test]
fn test_broken_cache_falls_back_to_storage() {
    let storage = Arc::new(CountingStorage::default());
    let cached = CachedStorage::new(
        Box::new(SharedStorage(Arc::clone(&storage))),
        Some(Box::new(BrokenCache)),
    );

    let id = cached.set("alice").unwrap();
    assert_eq!(cached.get(id).unwrap().name, "alice");
    assert_eq!(cached.get(id).unwrap().name, "alice");
    assert_eq!(storage.gets.load(Ordering::SeqCst), 2);
}

#[test]
fn test_uncached_passes_through() {
    let storage = Arc::new(CountingStorage::default());
    let cached = CachedStorage::uncached(Box::new(SharedStorage(Arc::clone(&storage))));
    assert!(!cached.is_cache_enabled());

    let id = cached.set("alice").unwrap();
    cached.get(id).unwrap();
    cached.get(id).unwrap();

    assert_eq!(storage.gets.load(Ordering::SeqCst), 2);
    cached.close().unwrap();
}
