// src/index/lookup.rs
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use super::{Index, Indexes, Record};

/// Owns the live index set. A rebuild swaps in a whole new `Indexes`
/// behind one pointer, so a query sees either the old set or the new one.
/// Readers only hold the lock long enough to clone the `Arc`.
#[derive(Debug, Default)]
pub struct LookupService {
    live: RwLock<Arc<Indexes>>,
}

impl LookupService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the live indexes wholesale.
    pub fn replace(&self, indexes: Indexes) {
        let next = Arc::new(indexes);
        let keys = next.key_count();
        *self.live.write().unwrap_or_else(PoisonError::into_inner) = next;
        info!(keys, "index swapped");
    }

    /// Snapshot of the current indexes; stays valid across later swaps.
    pub fn snapshot(&self) -> Arc<Indexes> {
        let guard = self.live.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    pub fn key_count(&self) -> usize {
        self.snapshot().key_count()
    }

    /// Records whose VIN ends in `key`. The key is matched literally, so a
    /// key shorter than 8 characters only hits if such a key was indexed.
    pub fn query_by_last8(&self, key: &str) -> Vec<Arc<Record>> {
        query(&self.snapshot().by_last8, key)
    }

    pub fn query_by_unit(&self, value: &str) -> Vec<Arc<Record>> {
        query(&self.snapshot().by_unit, &value.trim().to_uppercase())
    }

    pub fn query_by_plate(&self, value: &str) -> Vec<Arc<Record>> {
        query(&self.snapshot().by_plate, &value.trim().to_uppercase())
    }
}

fn query(index: &Index, key: &str) -> Vec<Arc<Record>> {
    if key.is_empty() {
        return Vec::new();
    }
    index.get(key).cloned().unwrap_or_default()
}
