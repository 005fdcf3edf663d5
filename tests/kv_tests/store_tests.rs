//! Tests for the KvStore
//!
//! These tests verify:
//! - Put/get through the memtable and SSTables
//! - Atomic batches
//! - Flush on memtable size limit
//! - Recovery of unflushed writes from the WAL
//! - Tolerance of a torn WAL tail
//! - Bounded SSTable count across sessions
//! - Writes surviving a failed flush

use std::fs::{self, OpenOptions};
use std::io::Write;

use recordvault::config::KvConfig;
use recordvault::kv::{KvStore, WriteBatch, WriteOptions};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn small_config(temp: &TempDir, limit: usize) -> KvConfig {
    let mut config = KvConfig::new(temp.path());
    config.memtable_size_limit = limit;
    config
}

fn sstable_files(temp: &TempDir) -> usize {
    fs::read_dir(temp.path().join("sstables")).unwrap().count()
}

/// Swap the table directory for a plain file so table writes fail
fn block_table_dir(temp: &TempDir) {
    let dir = temp.path().join("sstables");
    fs::rename(&dir, temp.path().join("sstables.bak")).unwrap();
    fs::write(&dir, b"not a directory").unwrap();
}

fn unblock_table_dir(temp: &TempDir) {
    let dir = temp.path().join("sstables");
    fs::remove_file(&dir).unwrap();
    fs::rename(temp.path().join("sstables.bak"), &dir).unwrap();
}

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_put_get() {
    let temp = TempDir::new().unwrap();
    let store = KvStore::open_path(temp.path()).unwrap();

    store.put(b"name", b"alice", WriteOptions::default()).unwrap();

    assert_eq!(store.get(b"name").unwrap(), Some(b"alice".to_vec()));
    assert_eq!(store.get(b"other").unwrap(), None);
    assert_eq!(store.memtable_entry_count(), 1);
}

#[test]
fn test_batch_applies_all_puts() {
    let temp = TempDir::new().unwrap();
    let store = KvStore::open_path(temp.path()).unwrap();

    let mut batch = WriteBatch::new();
    batch.put("a", "1").put("b", "2");
    assert_eq!(batch.len(), 2);
    store.write(batch, WriteOptions::sync()).unwrap();

    assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_empty_batch_is_noop() {
    let temp = TempDir::new().unwrap();
    let store = KvStore::open_path(temp.path()).unwrap();

    store.write(WriteBatch::new(), WriteOptions::sync()).unwrap();
    store.write_with(WriteOptions::default(), |_| {}).unwrap();

    assert_eq!(store.memtable_entry_count(), 0);
    assert_eq!(std::fs::metadata(store.wal_path()).unwrap().len(), 0);
}

#[test]
fn test_flush_on_size_limit() {
    let temp = TempDir::new().unwrap();
    let store = KvStore::open(small_config(&temp, 64)).unwrap();

    for i in 0..20 {
        store
            .put(format!("key{i:02}").as_bytes(), b"0123456789", WriteOptions::default())
            .unwrap();
    }

    assert!(store.sstable_count() >= 1);
    assert!(store.memtable_size() < 64);
    for i in 0..20 {
        assert_eq!(
            store.get(format!("key{i:02}").as_bytes()).unwrap(),
            Some(b"0123456789".to_vec())
        );
    }
}

#[test]
fn test_overwrite_across_flush() {
    let temp = TempDir::new().unwrap();
    let store = KvStore::open_path(temp.path()).unwrap();

    store.put(b"k", b"v1", WriteOptions::default()).unwrap();
    store.flush().unwrap();
    store.put(b"k", b"v2", WriteOptions::default()).unwrap();

    assert_eq!(store.get(b"k").unwrap(), Some(b"v2".to_vec()));
    store.flush().unwrap();
    assert_eq!(store.get(b"k").unwrap(), Some(b"v2".to_vec()));
}

// =============================================================================
// Persistence and Recovery
// =============================================================================

#[test]
fn test_close_and_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let store = KvStore::open_path(temp.path()).unwrap();
        store.put(b"a", b"1", WriteOptions::default()).unwrap();
        store.close().unwrap();
    }

    let store = KvStore::open_path(temp.path()).unwrap();
    assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(store.sstable_count(), 1);
}

#[test]
fn test_recover_without_close() {
    let temp = TempDir::new().unwrap();
    {
        let store = KvStore::open_path(temp.path()).unwrap();
        store.put(b"a", b"1", WriteOptions::sync()).unwrap();
        store.put(b"b", b"2", WriteOptions::sync()).unwrap();
        // Dropped without close: only the WAL has the data
        assert_eq!(store.sstable_count(), 0);
    }

    let store = KvStore::open_path(temp.path()).unwrap();
    assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));

    // Replayed entries were moved into an SSTable and the WAL emptied
    assert_eq!(store.sstable_count(), 1);
    assert_eq!(std::fs::metadata(store.wal_path()).unwrap().len(), 0);
}

#[test]
fn test_recover_ignores_torn_tail() {
    let temp = TempDir::new().unwrap();
    let wal_path;
    {
        let store = KvStore::open_path(temp.path()).unwrap();
        store.put(b"kept", b"yes", WriteOptions::sync()).unwrap();
        wal_path = store.wal_path();
    }

    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0xAB; 11]).unwrap();
    drop(file);

    let store = KvStore::open_path(temp.path()).unwrap();
    assert_eq!(store.get(b"kept").unwrap(), Some(b"yes".to_vec()));

    store.put(b"after", b"ok", WriteOptions::sync()).unwrap();
    drop(store);

    let store = KvStore::open_path(temp.path()).unwrap();
    assert_eq!(store.get(b"after").unwrap(), Some(b"ok".to_vec()));
}

// =============================================================================
// Compaction and Flush Failures
// =============================================================================

#[test]
fn test_table_count_bounded_across_sessions() {
    let temp = TempDir::new().unwrap();
    let mut config = KvConfig::new(temp.path());
    config.max_sstables = 4;

    for i in 0..30 {
        let store = KvStore::open(config.clone()).unwrap();
        store
            .put(format!("key{i:02}").as_bytes(), b"v", WriteOptions::sync())
            .unwrap();
        store.close().unwrap();

        assert!(sstable_files(&temp) <= 4, "session {i}: {} tables", sstable_files(&temp));
    }

    let store = KvStore::open(config).unwrap();
    assert!(store.sstable_count() <= 4);
    for i in 0..30 {
        assert_eq!(store.get(format!("key{i:02}").as_bytes()).unwrap(), Some(b"v".to_vec()));
    }
}

#[test]
fn test_compaction_keeps_latest_values() {
    let temp = TempDir::new().unwrap();
    let mut config = KvConfig::new(temp.path());
    config.max_sstables = 2;
    let store = KvStore::open(config).unwrap();

    for round in 0..5 {
        store.put(b"shared", format!("v{round}").as_bytes(), WriteOptions::default()).unwrap();
        store.flush().unwrap();
    }

    assert!(store.sstable_count() <= 2);
    assert_eq!(store.get(b"shared").unwrap(), Some(b"v4".to_vec()));
}

#[test]
fn test_write_survives_failed_flush() {
    let temp = TempDir::new().unwrap();
    let store = KvStore::open(small_config(&temp, 16)).unwrap();

    block_table_dir(&temp);
    store.put(b"key", &[9u8; 32], WriteOptions::sync()).unwrap();

    assert_eq!(store.get(b"key").unwrap(), Some(vec![9u8; 32]));
    assert_eq!(store.sstable_count(), 0);

    unblock_table_dir(&temp);
    store.flush().unwrap();

    assert_eq!(store.sstable_count(), 1);
    assert_eq!(store.memtable_entry_count(), 0);
    assert_eq!(store.get(b"key").unwrap(), Some(vec![9u8; 32]));
}

#[test]
fn test_failed_close_keeps_wal() {
    let temp = TempDir::new().unwrap();
    {
        let store = KvStore::open_path(temp.path()).unwrap();
        store.put(b"a", b"1", WriteOptions::sync()).unwrap();

        block_table_dir(&temp);
        assert!(store.close().is_err());
    }
    unblock_table_dir(&temp);

    let store = KvStore::open_path(temp.path()).unwrap();
    assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
}
