//! Record storage engines
//!
//! [`Storage`] is the contract the request handler (and the cache-aside
//! layer) programs against. Two engines implement it:
//!
//! - [`KeyValueStorage`]: allocates ids itself on top of the embedded
//!   [`crate::kv::KvStore`]
//! - [`RelationalStorage`]: delegates id allocation and durability to SQLite
//!
//! [`open_storage`] picks one from configuration.

mod keyvalue;
mod relational;

pub use keyvalue::KeyValueStorage;
pub use relational::RelationalStorage;

use crate::config::{Config, StorageKind};
use crate::error::Result;
use crate::record::Record;

/// A durable record store with engine-assigned ids
///
/// Implementations are shared between request threads, so every method takes
/// `&self`. `close` is called once, after in-flight calls have finished;
/// calls made after it fail with [`crate::VaultError::Closed`].
pub trait Storage: Send + Sync {
    /// Store `value` under a newly allocated id and return the id
    fn set(&self, value: &str) -> Result<i64>;

    /// Fetch the record stored under `id`
    fn get(&self, id: i64) -> Result<Record>;

    /// Persist engine bookkeeping and release the underlying store
    fn close(&self) -> Result<()>;
}

/// Construct the storage engine named by `config.storage_kind`
pub fn open_storage(config: &Config) -> Result<Box<dyn Storage>> {
    tracing::info!(kind = %config.storage_kind, "Opening storage");

    match config.storage_kind {
        StorageKind::KeyValue => Ok(Box::new(KeyValueStorage::open_with(
            config.kv_config(),
            config.counter_persistence,
        )?)),
        StorageKind::Relational => {
            Ok(Box::new(RelationalStorage::open(&config.database_path())?))
        }
    }
}
