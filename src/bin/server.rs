//! recordvault Server Binary
//!
//! Opens the configured storage (and cache) and serves it over TCP.

use std::sync::Arc;

use clap::Parser;
use recordvault::config::{CacheKind, CounterPersistence, StorageKind};
use recordvault::network::Server;
use recordvault::{Config, Storage};
use tracing_subscriber::{fmt, EnvFilter};

/// recordvault Server
#[derive(Parser, Debug)]
#[command(name = "recordvault-server")]
#[command(about = "Durable record store with sequential ids")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./recordvault_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7420")]
    listen: String,

    /// Connection worker threads
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// Storage engine [keyvalue, relational]
    #[arg(long, default_value = "keyvalue")]
    storage_type: StorageKind,

    /// SQLite file for the relational engine (default: <data-dir>/records.sqlite3)
    #[arg(long)]
    database_path: Option<String>,

    /// When the id counter is persisted [every-insert, on-close]
    #[arg(long, default_value = "every-insert")]
    counter_persistence: CounterPersistence,

    /// MemTable size limit in MB before flush
    #[arg(short = 'm', long, default_value = "64")]
    memtable_mb: usize,

    /// Serve reads through a cache
    #[arg(long)]
    enable_cache: bool,

    /// Cache backend [memcache, memory]
    #[arg(long, default_value = "memcache")]
    cache_type: CacheKind,

    /// memcached address (host:port)
    #[arg(long, default_value = "127.0.0.1:11211")]
    memcache_address: String,

    /// Log level [error, warn, info, debug, trace] (RUST_LOG overrides)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

fn main() {
    let args = Args::parse();

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.to_string().to_lowercase()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tracing::info!("recordvault Server v{}", recordvault::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .worker_threads(args.workers)
        .storage_kind(args.storage_type)
        .counter_persistence(args.counter_persistence)
        .memtable_size_limit(args.memtable_mb * 1024 * 1024)
        .enable_cache(args.enable_cache)
        .cache_kind(args.cache_type)
        .memcache_addr(&args.memcache_address);
    if let Some(path) = &args.database_path {
        builder = builder.database_path(path);
    }
    let config = builder.build();

    let storage: Arc<dyn Storage> = match recordvault::open(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open storage: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Storage initialized successfully");

    let server = match Server::bind(config, Arc::clone(&storage)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    let result = server.run();

    if let Err(e) = storage.close() {
        tracing::error!("Error while closing storage: {}", e);
    }

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
