//! Configuration for recordvault
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::VaultError;

/// Main configuration for a recordvault instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log, key-value engine)
    ///     ├── sstables/        (SSTable files, key-value engine)
    ///     └── records.sqlite3  (relational engine, unless overridden)
    pub data_dir: PathBuf,

    /// Which storage engine to construct
    pub storage_kind: StorageKind,

    /// SQLite database file for the relational engine
    /// (`None` means `{data_dir}/records.sqlite3`)
    pub database_path: Option<PathBuf>,

    /// When the key-value engine persists its id allocator
    pub counter_persistence: CounterPersistence,

    // -------------------------------------------------------------------------
    // WAL / MemTable Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// Max size of memtable before flush (in bytes)
    pub memtable_size_limit: usize,

    /// SSTable count above which all tables are merged into one
    pub max_sstables: usize,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    pub cache: CacheConfig,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Number of connection worker threads
    pub worker_threads: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

/// When the key-value engine writes its allocator counter to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterPersistence {
    /// Counter is written in the same atomic batch as every record.
    /// Survives crashes.
    #[default]
    EveryInsert,

    /// Counter is written only by `close()`. A crash between an insert and
    /// close leaves the durable counter behind the stored records, and the
    /// next session's inserts fail the integrity check.
    OnClose,
}

/// Storage engine selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// Embedded LSM key-value engine
    #[default]
    KeyValue,

    /// SQLite-backed relational engine
    Relational,
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKind {
    /// External memcached server
    #[default]
    Memcache,

    /// Bounded in-process map
    Memory,
}

/// Cache-aside configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether reads go through a cache at all
    pub enabled: bool,

    pub kind: CacheKind,

    /// memcached server address (host:port)
    pub memcache_addr: String,

    /// Connect/read/write timeout for cache calls (milliseconds)
    pub timeout_ms: u64,

    /// Max entries held by the in-process cache
    pub memory_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: CacheKind::Memcache,
            memcache_addr: "127.0.0.1:11211".to_string(),
            timeout_ms: 250,
            memory_capacity: 10_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./recordvault_data"),
            storage_kind: StorageKind::KeyValue,
            database_path: None,
            counter_persistence: CounterPersistence::EveryInsert,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            memtable_size_limit: 64 * 1024 * 1024, // 64 MB
            max_sstables: 8,
            cache: CacheConfig::default(),
            listen_addr: "127.0.0.1:7420".to_string(),
            worker_threads: 8,
            read_timeout_ms: 30_000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Resolved SQLite path for the relational engine
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("records.sqlite3"))
    }

    /// Settings for the embedded key-value store under `data_dir`
    pub fn kv_config(&self) -> KvConfig {
        KvConfig {
            dir: self.data_dir.clone(),
            wal_sync_strategy: self.wal_sync_strategy,
            memtable_size_limit: self.memtable_size_limit,
            max_sstables: self.max_sstables,
        }
    }
}

/// Settings for a single [`crate::kv::KvStore`]
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Directory holding `wal.log` and `sstables/`
    pub dir: PathBuf,
    pub wal_sync_strategy: WalSyncStrategy,
    pub memtable_size_limit: usize,
    pub max_sstables: usize,
}

impl KvConfig {
    /// Defaults for a store rooted at `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let defaults = Config::default();
        Self {
            dir: dir.as_ref().to_path_buf(),
            wal_sync_strategy: defaults.wal_sync_strategy,
            memtable_size_limit: defaults.memtable_size_limit,
            max_sstables: defaults.max_sstables,
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Select the storage engine
    pub fn storage_kind(mut self, kind: StorageKind) -> Self {
        self.config.storage_kind = kind;
        self
    }

    /// Override the SQLite file used by the relational engine
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    pub fn counter_persistence(mut self, policy: CounterPersistence) -> Self {
        self.config.counter_persistence = policy;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the memtable size limit (in bytes)
    pub fn memtable_size_limit(mut self, size: usize) -> Self {
        self.config.memtable_size_limit = size;
        self
    }

    /// Set the SSTable count that triggers a merge
    pub fn max_sstables(mut self, count: usize) -> Self {
        self.config.max_sstables = count;
        self
    }

    /// Turn the read cache on or off
    pub fn enable_cache(mut self, enabled: bool) -> Self {
        self.config.cache.enabled = enabled;
        self
    }

    pub fn cache_kind(mut self, kind: CacheKind) -> Self {
        self.config.cache.kind = kind;
        self
    }

    /// Set the memcached server address
    pub fn memcache_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.cache.memcache_addr = addr.into();
        self
    }

    /// Set the cache call timeout (in milliseconds)
    pub fn cache_timeout_ms(mut self, ms: u64) -> Self {
        self.config.cache.timeout_ms = ms;
        self
    }

    /// Set the in-process cache capacity (entries)
    pub fn memory_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache.memory_capacity = capacity;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of connection worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// String parsing (CLI flags)
// =============================================================================

impl FromStr for StorageKind {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keyvalue" | "kv" | "pebble" => Ok(StorageKind::KeyValue),
            "relational" | "sqlite" | "sql" => Ok(StorageKind::Relational),
            _ => Err(VaultError::Config(format!("invalid storage type: {s}"))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::KeyValue => f.write_str("keyvalue"),
            StorageKind::Relational => f.write_str("relational"),
        }
    }
}

impl FromStr for CacheKind {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memcache" | "memcached" => Ok(CacheKind::Memcache),
            "memory" => Ok(CacheKind::Memory),
            _ => Err(VaultError::Config(format!("invalid cache type: {s}"))),
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::Memcache => f.write_str("memcache"),
            CacheKind::Memory => f.write_str("memory"),
        }
    }
}

impl FromStr for CounterPersistence {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "every-insert" | "insert" => Ok(CounterPersistence::EveryInsert),
            "on-close" | "close" => Ok(CounterPersistence::OnClose),
            _ => Err(VaultError::Config(format!(
                "invalid counter persistence policy: {s}"
            ))),
        }
    }
}
