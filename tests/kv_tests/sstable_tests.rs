//! Tests for SSTables and the table manager
//!
//! These tests verify:
//! - Building and reading tables
//! - Key ordering enforcement
//! - Corruption detection on open
//! - Newest-first lookups across tables
//! - Cleanup of unfinished table files
//! - Compaction into a single table

use std::fs;
use std::path::PathBuf;

use recordvault::kv::sstable::{SSTableBuilder, SSTableReader};
use recordvault::kv::TableManager;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_sst() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.sst");
    (temp_dir, path)
}

fn build_table(path: &PathBuf, count: usize) {
    let mut builder = SSTableBuilder::new(path).unwrap();
    for i in 0..count {
        builder
            .add(format!("key{i:04}").as_bytes(), format!("value{i}").as_bytes())
            .unwrap();
    }
    builder.finish().unwrap();
}

fn entries(pairs: &[(&str, &str)]) -> Vec<(Vec<u8>, Vec<u8>)> {
    pairs
        .iter()
        .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
        .collect()
}

// =============================================================================
// Builder / Reader Tests
// =============================================================================

#[test]
fn test_build_and_read() {
    let (_temp, path) = setup_temp_sst();

    let mut builder = SSTableBuilder::new(&path).unwrap();
    builder.add(b"apple", b"red").unwrap();
    builder.add(b"banana", b"yellow").unwrap();
    builder.add(b"cherry", b"dark red").unwrap();
    let table = builder.finish().unwrap();

    assert_eq!(table.entry_count, 3);
    assert_eq!(table.min_key, b"apple".to_vec());
    assert_eq!(table.max_key, b"cherry".to_vec());
    assert_eq!(table.file_size, fs::metadata(&path).unwrap().len());

    let reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.entry_count(), 3);
    assert_eq!(reader.get(b"banana").unwrap(), Some(b"yellow".to_vec()));
    assert_eq!(reader.get(b"cherry").unwrap(), Some(b"dark red".to_vec()));
    assert_eq!(reader.get(b"durian").unwrap(), None);
}

#[test]
fn test_many_entries() {
    let (_temp, path) = setup_temp_sst();
    build_table(&path, 500);

    let reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.entry_count(), 500);
    assert_eq!(reader.get(b"key0000").unwrap(), Some(b"value0".to_vec()));
    assert_eq!(reader.get(b"key0499").unwrap(), Some(b"value499".to_vec()));
    assert_eq!(reader.min_key(), Some(&b"key0000"[..]));
    assert_eq!(reader.max_key(), Some(&b"key0499"[..]));
    assert!(!reader.might_contain(b"zzz"));
}

#[test]
fn test_rejects_unsorted_keys() {
    let (_temp, path) = setup_temp_sst();

    let mut builder = SSTableBuilder::new(&path).unwrap();
    builder.add(b"b", b"1").unwrap();
    assert!(builder.add(b"a", b"2").is_err());
    assert!(builder.add(b"b", b"3").is_err());
}

#[test]
fn test_detects_data_corruption() {
    let (_temp, path) = setup_temp_sst();
    build_table(&path, 10);

    // First byte after the 14-byte header is inside the data block
    let mut bytes = fs::read(&path).unwrap();
    bytes[20] ^= 0xff;
    fs::write(&path, &bytes).unwrap();

    assert!(SSTableReader::open(&path).is_err());
}

#[test]
fn test_rejects_bad_magic() {
    let (_temp, path) = setup_temp_sst();
    build_table(&path, 2);

    let mut bytes = fs::read(&path).unwrap();
    bytes[0..4].copy_from_slice(b"NOPE");
    fs::write(&path, &bytes).unwrap();

    assert!(SSTableReader::open(&path).is_err());
}

#[test]
fn test_rejects_tiny_file() {
    let (_temp, path) = setup_temp_sst();
    fs::write(&path, b"RVST").unwrap();

    assert!(SSTableReader::open(&path).is_err());
}

// =============================================================================
// Manager Tests
// =============================================================================

#[test]
fn test_manager_newest_table_wins() {
    let temp = TempDir::new().unwrap();
    let manager = TableManager::open(temp.path()).unwrap();

    manager.flush(&entries(&[("a", "old"), ("b", "only")])).unwrap();
    manager.flush(&entries(&[("a", "new")])).unwrap();

    assert_eq!(manager.table_count(), 2);
    assert_eq!(manager.get(b"a").unwrap(), Some(b"new".to_vec()));
    assert_eq!(manager.get(b"b").unwrap(), Some(b"only".to_vec()));
    assert_eq!(manager.get(b"c").unwrap(), None);
}

#[test]
fn test_manager_reloads_tables() {
    let temp = TempDir::new().unwrap();
    {
        let manager = TableManager::open(temp.path()).unwrap();
        manager.flush(&entries(&[("k", "v1")])).unwrap();
        manager.flush(&entries(&[("k", "v2")])).unwrap();
    }

    let manager = TableManager::open(temp.path()).unwrap();
    assert_eq!(manager.table_count(), 2);
    assert_eq!(manager.get(b"k").unwrap(), Some(b"v2".to_vec()));

    // New tables keep sorting after the reloaded ones
    manager.flush(&entries(&[("k", "v3")])).unwrap();
    let manager = TableManager::open(temp.path()).unwrap();
    assert_eq!(manager.get(b"k").unwrap(), Some(b"v3".to_vec()));
}

#[test]
fn test_manager_removes_unfinished_tables() {
    let temp = TempDir::new().unwrap();
    let leftover = temp.path().join("sstable_000007.sst.tmp");
    fs::write(&leftover, b"partial").unwrap();

    let manager = TableManager::open(temp.path()).unwrap();

    assert!(!leftover.exists());
    assert_eq!(manager.table_count(), 0);
}

#[test]
fn test_compact_merges_into_one_table() {
    let temp = TempDir::new().unwrap();
    let manager = TableManager::open(temp.path()).unwrap();

    manager.flush(&entries(&[("a", "1"), ("b", "1")])).unwrap();
    manager.flush(&entries(&[("b", "2"), ("c", "2")])).unwrap();
    manager.flush(&entries(&[("c", "3")])).unwrap();

    manager.compact().unwrap();

    assert_eq!(manager.table_count(), 1);
    assert_eq!(manager.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(manager.get(b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(manager.get(b"c").unwrap(), Some(b"3".to_vec()));

    let files: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
    assert_eq!(files.len(), 1);

    // The merged table sorts after anything flushed before it
    manager.flush(&entries(&[("a", "4")])).unwrap();
    let manager = TableManager::open(temp.path()).unwrap();
    assert_eq!(manager.table_count(), 2);
    assert_eq!(manager.get(b"a").unwrap(), Some(b"4".to_vec()));
    assert_eq!(manager.get(b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_compact_single_table_is_noop() {
    let temp = TempDir::new().unwrap();
    let manager = TableManager::open(temp.path()).unwrap();
    let table = manager.flush(&entries(&[("k", "v")])).unwrap();

    manager.compact().unwrap();

    assert_eq!(manager.table_count(), 1);
    assert!(table.path.exists());
}

#[test]
fn test_reader_entries_in_key_order() {
    let (_temp, path) = setup_temp_sst();
    build_table(&path, 5);

    let reader = SSTableReader::open(&path).unwrap();
    let all = reader.entries().unwrap();

    assert_eq!(all.len(), 5);
    assert_eq!(all[0], (b"key0000".to_vec(), b"value0".to_vec()));
    assert_eq!(all[4], (b"key0004".to_vec(), b"value4".to_vec()));
}
