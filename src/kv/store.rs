//! KvStore
//!
//! Coordinates WAL, MemTable and SSTables.
//!
//! ## Responsibilities
//! - Serialize writers; reads run concurrently
//! - Make every acknowledged write durable in the WAL first
//! - Flush the MemTable to an SSTable when it grows past its limit
//! - Merge SSTables when there are more than `max_sstables`
//! - Recover from the WAL on startup

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::KvConfig;
use crate::error::Result;

use super::manager::TableManager;
use super::memtable::MemTable;
use super::wal::{Operation, WalRecovery, WalWriter};

/// Per-write durability options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// fsync the WAL before returning, whatever the sync strategy says
    pub sync: bool,
}

impl WriteOptions {
    /// Options that force an fsync
    pub fn sync() -> Self {
        Self { sync: true }
    }
}

/// A group of puts committed as one WAL entry
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    puts: Vec<(Vec<u8>, Vec<u8>)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.puts.push((key.into(), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.puts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }
}

/// The embedded key-value store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader
///
/// - **Writes** (`write`/`write_with`/`put`/`flush`): serialized by the WAL
///   mutex, which doubles as the writer lock. Order: WAL → memtable →
///   (maybe) SSTable flush.
/// - **Reads** (`get`): memtable read lock, then the table list read lock.
///   A flush publishes the new SSTable before clearing the memtable, so a
///   concurrent read always finds a flushed key in one of the two.
pub struct KvStore {
    config: KvConfig,

    /// Write-ahead log; holding this lock is holding the writer lock
    wal: Mutex<WalWriter>,

    memtable: MemTable,

    tables: TableManager,
}

impl KvStore {
    const WAL_FILENAME: &'static str = "wal.log";
    const SSTABLE_DIR: &'static str = "sstables";

    /// Open or create a store
    ///
    /// On startup:
    /// 1. Create the directory layout
    /// 2. Load existing SSTables
    /// 3. Recover the WAL (dropping a torn tail) and replay it
    /// 4. Flush recovered entries to an SSTable, then truncate the WAL
    /// 5. Merge SSTables if there are too many
    pub fn open(config: KvConfig) -> Result<Self> {
        fs::create_dir_all(&config.dir)?;

        let wal_path = config.dir.join(Self::WAL_FILENAME);
        let tables = TableManager::open(&config.dir.join(Self::SSTABLE_DIR))?;
        let memtable = MemTable::new();

        if wal_path.exists() {
            let (entries, result) = WalRecovery::recover(&wal_path)?;

            if result.entries_recovered > 0 || result.entries_corrupted > 0 {
                tracing::info!(
                    recovered = result.entries_recovered,
                    corrupted = result.entries_corrupted,
                    last_lsn = result.last_lsn,
                    "WAL recovery"
                );
            }

            for entry in entries {
                for (key, value) in entry.operation.into_puts() {
                    memtable.put(key, value);
                }
            }
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;

        // Recovered data goes to an SSTable before the WAL is emptied
        if !memtable.is_empty() {
            tables.flush(&memtable.entries())?;
            memtable.clear();
            wal.truncate()?;
        }
        Self::compact_if_needed(&tables, config.max_sstables);

        tracing::debug!(
            dir = %config.dir.display(),
            sstables = tables.table_count(),
            "Opened key-value store"
        );

        Ok(Self {
            config,
            wal: Mutex::new(wal),
            memtable,
            tables,
        })
    }

    /// Open with default settings rooted at `path`
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(KvConfig::new(path))
    }

    /// Get a value by key
    ///
    /// Search order: MemTable, then SSTables newest to oldest.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.memtable.get(key) {
            return Ok(Some(value));
        }
        self.tables.get(key)
    }

    /// Put a single key-value pair
    pub fn put(&self, key: &[u8], value: &[u8], opts: WriteOptions) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.write(batch, opts)
    }

    /// Commit a batch atomically
    pub fn write(&self, batch: WriteBatch, opts: WriteOptions) -> Result<()> {
        self.write_with(opts, move |b| *b = batch)
    }

    /// Build a batch while holding the writer lock, then commit it
    ///
    /// Values read from shared state inside `build` are committed in the
    /// same order they were read across all writers.
    pub fn write_with<F>(&self, opts: WriteOptions, build: F) -> Result<()>
    where
        F: FnOnce(&mut WriteBatch),
    {
        let mut wal = self.wal.lock();

        let mut batch = WriteBatch::new();
        build(&mut batch);
        if batch.is_empty() {
            return Ok(());
        }

        let operation = if batch.puts.len() == 1 {
            let (key, value) = batch.puts.remove(0);
            Operation::Put { key, value }
        } else {
            Operation::Batch { puts: batch.puts }
        };

        // Step 1: WAL first (durability)
        wal.append(operation.clone())?;
        if opts.sync {
            wal.sync()?;
        }

        // Step 2: MemTable
        let mut size = 0;
        for (key, value) in operation.into_puts() {
            size = self.memtable.put(key, value);
        }

        // Step 3: flush if full. The write is already durable, so a failed
        // flush is left for a later write to retry.
        if size >= self.config.memtable_size_limit {
            if let Err(e) = self.flush_locked(&mut wal) {
                tracing::warn!(error = %e, "MemTable flush failed");
            }
        }

        Ok(())
    }

    /// Flush the memtable to disk regardless of its size
    pub fn flush(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        self.flush_locked(&mut wal)
    }

    /// Flush with the writer lock already held
    fn flush_locked(&self, wal: &mut WalWriter) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        self.tables.flush(&self.memtable.entries())?;
        self.memtable.clear();

        // Entries are durable in the SSTable now
        wal.truncate()?;

        Self::compact_if_needed(&self.tables, self.config.max_sstables);
        Ok(())
    }

    /// Merge the tables once there are more than `max_sstables`
    ///
    /// A failed merge leaves every table intact and readable.
    fn compact_if_needed(tables: &TableManager, max_sstables: usize) {
        let count = tables.table_count();
        if count <= max_sstables.max(1) {
            return;
        }
        if let Err(e) = tables.compact() {
            tracing::warn!(tables = count, error = %e, "SSTable compaction failed");
        }
    }

    /// Close the store: flush the memtable and sync the WAL
    ///
    /// File handles are released when `self` drops, whether or not the
    /// flush succeeded.
    pub fn close(self) -> Result<()> {
        let mut wal = self.wal.lock();
        let flushed = self.flush_locked(&mut wal);
        let synced = wal.sync();
        flushed.and(synced)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    pub fn wal_path(&self) -> PathBuf {
        self.config.dir.join(Self::WAL_FILENAME)
    }

    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn sstable_count(&self) -> usize {
        self.tables.table_count()
    }

    pub fn config(&self) -> &KvConfig {
        &self.config
    }
}
