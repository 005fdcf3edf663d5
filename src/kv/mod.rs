//! Embedded ordered key-value store
//!
//! The persistence substrate under the key-value record engine: a small
//! LSM tree that stores opaque byte keys and values.
//!
//! ```text
//!            write / write_with / put
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//!   ┌─────────────┐         ┌─────────────┐
//!   │     WAL     │  then   │  MemTable   │
//!   │  (Append)   │ ──────▶ │  (RwLock)   │
//!   └─────────────┘         └──────┬──────┘
//!                                  │ flush when full / on close
//!                                  ▼
//!                          ┌──────────────┐
//!                          │   SSTables   │
//!                          │ newest first │
//!                          └──────────────┘
//! ```
//!
//! Each write call is one WAL entry, so a multi-key [`WriteBatch`] is
//! replayed completely or not at all after a crash.

pub mod wal;
pub mod memtable;
pub mod sstable;
mod manager;
mod store;

pub use manager::TableManager;
pub use memtable::MemTable;
pub use store::{KvStore, WriteBatch, WriteOptions};
