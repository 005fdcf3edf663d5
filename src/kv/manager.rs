//! SSTable Manager
//!
//! Owns the set of on-disk tables and coordinates reads/flushes.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup
//! - Search SSTables newest → oldest for reads
//! - Create new SSTables from MemTable flushes
//! - Merge tables once there are too many

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{Result, VaultError};

use super::sstable::{SSTable, SSTableBuilder, SSTableReader};

/// Manages the table layer
///
/// ## Concurrency:
/// - `tables`: RwLock; lookups take the read lock (readers lock their own
///   file handle), flushes take the write lock only to publish a new table
/// - `next_table_id`: atomic counter
pub struct TableManager {
    dir: PathBuf,

    /// Open readers, ordered newest → oldest
    tables: RwLock<Vec<SSTableReader>>,

    next_table_id: AtomicU64,
}

impl TableManager {
    /// Open or create the table directory and load every table in it
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut ids: Vec<u64> = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.to_string_lossy().ends_with(".sst.tmp") {
                tracing::warn!(path = %file_path.display(), "Removing unfinished SSTable");
                fs::remove_file(&file_path)?;
                continue;
            }
            if file_path.is_file() {
                if let Some(id) = Self::parse_table_id(&file_path) {
                    ids.push(id);
                }
            }
        }

        // Newest (highest id) first
        ids.sort_unstable_by(|a, b| b.cmp(a));

        let mut tables = Vec::with_capacity(ids.len());
        for id in &ids {
            tables.push(SSTableReader::open(&Self::table_path(path, *id))?);
        }

        let next_id = ids.first().map(|&id| id + 1).unwrap_or(1);

        tracing::debug!(dir = %path.display(), tables = tables.len(), "Loaded SSTables");

        Ok(Self {
            dir: path.to_path_buf(),
            tables: RwLock::new(tables),
            next_table_id: AtomicU64::new(next_id),
        })
    }

    /// Look a key up in every table, newest first
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let tables = self.tables.read();

        for reader in tables.iter() {
            if !reader.might_contain(key) {
                continue;
            }
            if let Some(value) = reader.get(key)? {
                return Ok(Some(value));
            }
        }

        Ok(None)
    }

    /// Write sorted entries to a new SSTable and make it visible to reads
    pub fn flush(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<SSTable> {
        if entries.is_empty() {
            return Err(VaultError::Storage("Cannot flush empty MemTable".to_string()));
        }

        let (metadata, reader) = self.write_table(entries)?;
        self.tables.write().insert(0, reader);

        tracing::debug!(
            path = %metadata.path.display(),
            entries = metadata.entry_count,
            bytes = metadata.file_size,
            "Flushed SSTable"
        );

        Ok(metadata)
    }

    /// Merge every table into a single one, newer values winning
    ///
    /// Must not run concurrently with `flush`; the store calls it with its
    /// writer lock held. The merged table takes a fresh (highest) id and is
    /// published before the old files are removed, so a crash in between
    /// leaves only stale duplicates that still lose to it on lookup.
    pub fn compact(&self) -> Result<()> {
        let merged = {
            let tables = self.tables.read();
            if tables.len() < 2 {
                return Ok(());
            }

            // Oldest first so newer values overwrite older ones
            let mut merged = BTreeMap::new();
            for reader in tables.iter().rev() {
                merged.extend(reader.entries()?);
            }
            merged
        };

        let entries: Vec<(Vec<u8>, Vec<u8>)> = merged.into_iter().collect();
        let (metadata, reader) = self.write_table(&entries)?;

        let old = std::mem::replace(&mut *self.tables.write(), vec![reader]);
        let old_paths: Vec<PathBuf> = old.iter().map(|t| t.path().to_path_buf()).collect();
        drop(old);

        for path in &old_paths {
            if let Err(e) = fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %e, "Could not remove merged SSTable");
            }
        }

        tracing::info!(
            merged = old_paths.len(),
            entries = metadata.entry_count,
            path = %metadata.path.display(),
            "Compacted SSTables"
        );

        Ok(())
    }

    /// Build a table under a temporary name, then rename it into place
    fn write_table(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<(SSTable, SSTableReader)> {
        let id = self.next_table_id.fetch_add(1, Ordering::SeqCst);
        let path = Self::table_path(&self.dir, id);

        // A crash mid-build never leaves a half-written table where `open`
        // would find it
        let tmp_path = path.with_extension("sst.tmp");
        let mut builder = SSTableBuilder::new(&tmp_path)?;
        for (key, value) in entries {
            builder.add(key, value)?;
        }
        let mut metadata = builder.finish()?;
        fs::rename(&tmp_path, &path)?;
        #[cfg(unix)]
        fs::File::open(&self.dir)?.sync_all()?;
        metadata.path = path.clone();

        let reader = SSTableReader::open(&path)?;
        Ok((metadata, reader))
    }

    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// "sstable_000042.sst"
    fn table_path(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("sstable_{:06}.sst", id))
    }

    /// "sstable_000042.sst" → Some(42)
    fn parse_table_id(path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        name.strip_prefix("sstable_")?.parse().ok()
    }
}
