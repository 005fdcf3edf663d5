//! Key-value record engine
//!
//! Records live in a [`KvStore`] keyed by the 8-byte encoding of their id.
//! Ids come from an in-memory atomic counter; its durable copy sits under
//! [`NEXT_ID_KEY`].
//!
//! ## Counter persistence
//! With [`CounterPersistence::EveryInsert`] every record is written in one
//! atomic batch together with the counter, so a crash never loses the
//! allocator's progress. With [`CounterPersistence::OnClose`] the counter is
//! written only by `close()`; after a crash the next session allocates ids
//! that already hold records, and `set` reports [`VaultError::Integrity`]
//! rather than overwriting them.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;

use crate::codec::{decode_id, encode_id, NEXT_ID_KEY};
use crate::config::{CounterPersistence, KvConfig};
use crate::error::{Result, VaultError};
use crate::kv::{KvStore, WriteOptions};
use crate::record::Record;

use super::Storage;

/// Record engine on top of the embedded key-value store
pub struct KeyValueStorage {
    /// `None` once closed
    store: RwLock<Option<KvStore>>,

    /// Last issued id
    next_id: AtomicI64,

    persistence: CounterPersistence,
}

impl KeyValueStorage {
    /// Open (creating if absent) a store at `path` with default settings
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(KvConfig::new(path), CounterPersistence::default())
    }

    /// Open with explicit store settings and counter policy
    pub fn open_with(config: KvConfig, persistence: CounterPersistence) -> Result<Self> {
        let dir = config.dir.clone();
        let store = KvStore::open(config).map_err(|e| {
            tracing::error!(path = %dir.display(), error = %e, "Failed to open key-value store");
            e
        })?;

        let next_id = load_next_id(&store)?;
        tracing::debug!(next_id, ?persistence, "Loaded id counter");

        Ok(Self {
            store: RwLock::new(Some(store)),
            next_id: AtomicI64::new(next_id),
            persistence,
        })
    }

    /// Last id handed out (0 if none yet)
    pub fn last_id(&self) -> i64 {
        self.next_id.load(Ordering::SeqCst)
    }

    pub fn persistence(&self) -> CounterPersistence {
        self.persistence
    }
}

impl Storage for KeyValueStorage {
    fn set(&self, value: &str) -> Result<i64> {
        let guard = self.store.read();
        let store = guard.as_ref().ok_or(VaultError::Closed)?;

        let id = self
            .next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .map(|previous| previous + 1)
            .map_err(|last| {
                tracing::error!(last, "Id space exhausted");
                VaultError::Storage("id space exhausted".to_string())
            })?;
        let key = encode_id(id);

        // The counter never repeats, so a hit here means the allocator state
        // on disk was behind the records
        if store.get(&key)?.is_some() {
            tracing::error!(id, "Allocated id already has a record");
            return Err(VaultError::Integrity { id });
        }

        let written = match self.persistence {
            CounterPersistence::EveryInsert => {
                store.write_with(WriteOptions::sync(), |batch| {
                    batch.put(key, value.as_bytes());
                    batch.put(NEXT_ID_KEY, encode_id(self.next_id.load(Ordering::SeqCst)));
                })
            }
            CounterPersistence::OnClose => store.put(&key, value.as_bytes(), WriteOptions::sync()),
        };

        if let Err(e) = written {
            tracing::error!(id, error = %e, "Failed to write record");
            return Err(e);
        }

        tracing::debug!(id, "Stored record");
        Ok(id)
    }

    fn get(&self, id: i64) -> Result<Record> {
        let guard = self.store.read();
        let store = guard.as_ref().ok_or(VaultError::Closed)?;

        match store.get(&encode_id(id)) {
            Ok(Some(value)) => Ok(Record {
                id,
                name: String::from_utf8_lossy(&value).into_owned(),
            }),
            Ok(None) => {
                tracing::debug!(id, "Record not found");
                Err(VaultError::NotFound { id })
            }
            Err(e) => {
                tracing::error!(id, error = %e, "Failed to read record");
                Err(e)
            }
        }
    }

    fn close(&self) -> Result<()> {
        let store = self.store.write().take().ok_or(VaultError::Closed)?;
        let next_id = self.next_id.load(Ordering::SeqCst);

        let persisted = store.put(NEXT_ID_KEY, &encode_id(next_id), WriteOptions::sync());
        match &persisted {
            Ok(()) => tracing::debug!(next_id, "Saved id counter"),
            Err(e) => tracing::warn!(next_id, error = %e, "Could not save id counter"),
        }

        tracing::info!(dir = %store.dir().display(), "Closing key-value store");

        // The store is consumed either way, releasing its files
        let closed = store.close();
        persisted.and(closed)
    }
}

/// Counter recovery: the reserved key, or 0 for a fresh store
fn load_next_id(store: &KvStore) -> Result<i64> {
    match store.get(NEXT_ID_KEY)? {
        Some(bytes) => match decode_id(&bytes)? {
            n if n < 0 => Err(VaultError::Storage(format!("stored id counter is negative: {n}"))),
            n => Ok(n),
        },
        None => Ok(0),
    }
}
