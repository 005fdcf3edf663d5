//! Tests for engine selection from configuration

use recordvault::config::{CacheKind, StorageKind};
use recordvault::{open, open_storage, Config, Storage};
use tempfile::TempDir;

#[test]
fn test_selects_keyvalue_engine() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .storage_kind(StorageKind::KeyValue)
        .build();

    let storage = open_storage(&config).unwrap();
    assert_eq!(storage.set("alice").unwrap(), 1);
    storage.close().unwrap();

    assert!(temp.path().join("wal.log").exists());
    assert!(temp.path().join("sstables").is_dir());
}

#[test]
fn test_selects_relational_engine() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .storage_kind(StorageKind::Relational)
        .build();

    let storage = open_storage(&config).unwrap();
    assert_eq!(storage.set("alice").unwrap(), 1);
    assert_eq!(storage.get(1).unwrap().name, "alice");
    storage.close().unwrap();

    assert!(temp.path().join("records.sqlite3").exists());
}

#[test]
fn test_relational_database_path_override() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("elsewhere.db");
    let config = Config::builder()
        .data_dir(temp.path().join("data"))
        .storage_kind(StorageKind::Relational)
        .database_path(&db)
        .build();

    let storage = open_storage(&config).unwrap();
    storage.set("alice").unwrap();
    storage.close().unwrap();

    assert!(db.exists());
}

#[test]
fn test_open_with_memory_cache() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .enable_cache(true)
        .cache_kind(CacheKind::Memory)
        .build();

    let storage = open(&config).unwrap();
    assert!(storage.is_cache_enabled());

    let id = storage.set("alice").unwrap();
    assert_eq!(storage.get(id).unwrap().name, "alice");
    assert_eq!(storage.get(id).unwrap().name, "alice");
    storage.close().unwrap();
}

#[test]
fn test_open_without_cache() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp.path()).build();

    let storage = open(&config).unwrap();
    assert!(!storage.is_cache_enabled());
    storage.close().unwrap();
}

#[test]
fn test_unreachable_memcached_is_not_fatal() {
    let temp = TempDir::new().unwrap();
    // Bind then drop a listener to get a port nothing listens on
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .enable_cache(true)
        .cache_kind(CacheKind::Memcache)
        .memcache_addr(addr.to_string())
        .cache_timeout_ms(100)
        .build();

    let storage = open(&config).unwrap();
    assert!(storage.is_cache_enabled());

    let id = storage.set("alice").unwrap();
    assert_eq!(storage.get(id).unwrap().name, "alice");
    storage.close().unwrap();
}
