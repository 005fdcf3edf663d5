//! Tests for the in-process cache

use recordvault::cache::{CacheError, MemoryCache, RecordCache};
use recordvault::Record;

#[test]
fn test_set_and_get() {
    let cache = MemoryCache::new(10);
    cache.set(1, &Record::new(1, "alice")).unwrap();

    assert_eq!(cache.get(1).unwrap(), Record::new(1, "alice"));
    assert!(matches!(cache.get(2), Err(CacheError::Miss)));
}

#[test]
fn test_evicts_oldest_first() {
    let cache = MemoryCache::new(2);
    cache.set(1, &Record::new(1, "a")).unwrap();
    cache.set(2, &Record::new(2, "b")).unwrap();
    cache.set(3, &Record::new(3, "c")).unwrap();

    assert_eq!(cache.len(), 2);
    assert!(!cache.contains(1));
    assert!(cache.contains(2));
    assert!(cache.contains(3));
}

#[test]
fn test_overwrite_keeps_one_slot() {
    let cache = MemoryCache::new(2);
    cache.set(1, &Record::new(1, "a")).unwrap();
    cache.set(1, &Record::new(1, "a")).unwrap();
    cache.set(2, &Record::new(2, "b")).unwrap();

    assert_eq!(cache.len(), 2);
    assert!(cache.contains(1));
}

#[test]
fn test_zero_capacity_holds_one() {
    let cache = MemoryCache::new(0);
    assert!(cache.is_empty());

    cache.set(1, &Record::new(1, "a")).unwrap();
    cache.set(2, &Record::new(2, "b")).unwrap();

    assert_eq!(cache.len(), 1);
    assert!(cache.contains(2));
}
