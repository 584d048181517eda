use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of a pool's operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub hits: u64,
    pub misses: u64,
    /// Entry files written, including miss placeholders.
    pub entry_writes: u64,
    /// Successful rewrites of the index file.
    pub index_writes: u64,
    /// Entry files removed by delete or clear.
    pub deletes: u64,
}

#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    entry_writes: AtomicU64,
    index_writes: AtomicU64,
    deletes: AtomicU64,
}

impl PoolCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn entry_write(&self) {
        self.entry_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn index_write(&self) {
        self.index_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PoolStats {
        PoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_writes: self.entry_writes.load(Ordering::Relaxed),
            index_writes: self.index_writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }
}
