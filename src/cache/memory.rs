//! In-process cache
//!
//! A bounded map with first-in-first-out eviction. Useful when no memcached
//! is around, and as a deterministic cache in tests.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::record::Record;

use super::{CacheError, RecordCache};

pub struct MemoryCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<i64, Record>,
    /// Insertion order, oldest at the front
    order: VecDeque<i64>,
}

impl MemoryCache {
    /// A cache holding at most `capacity` records (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: i64) -> bool {
        self.inner.lock().entries.contains_key(&id)
    }
}

impl RecordCache for MemoryCache {
    fn set(&self, id: i64, record: &Record) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();

        if inner.entries.insert(id, record.clone()).is_none() {
            inner.order.push_back(id);
        }

        while inner.entries.len() > self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }

        Ok(())
    }

    fn get(&self, id: i64) -> Result<Record, CacheError> {
        self.inner.lock().entries.get(&id).cloned().ok_or(CacheError::Miss)
    }
}
