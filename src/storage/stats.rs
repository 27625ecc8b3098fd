//! Storage engine statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Engine-wide I/O counters.
///
/// `documents_read` counts reads of durable storage only; cache hits do
/// not touch it. All fields are atomic with `Ordering::Relaxed`.
#[derive(Debug, Default)]
pub struct StorageStats {
    /// Document files read and decoded.
    pub documents_read: AtomicU64,

    /// Document files written.
    pub documents_written: AtomicU64,

    /// Document files removed.
    pub documents_deleted: AtomicU64,

    /// Ids handed out by `next_id`.
    pub ids_allocated: AtomicU64,

    /// Per-column index re-associations.
    pub index_updates: AtomicU64,
}

impl StorageStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a non-atomic copy for display/logging.
    pub fn snapshot(&self) -> StorageStatsSnapshot {
        StorageStatsSnapshot {
            documents_read: self.documents_read.load(Ordering::Relaxed),
            documents_written: self.documents_written.load(Ordering::Relaxed),
            documents_deleted: self.documents_deleted.load(Ordering::Relaxed),
            ids_allocated: self.ids_allocated.load(Ordering::Relaxed),
            index_updates: self.index_updates.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.documents_read.store(0, Ordering::Relaxed);
        self.documents_written.store(0, Ordering::Relaxed);
        self.documents_deleted.store(0, Ordering::Relaxed);
        self.ids_allocated.store(0, Ordering::Relaxed);
        self.index_updates.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of storage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageStatsSnapshot {
    pub documents_read: u64,
    pub documents_written: u64,
    pub documents_deleted: u64,
    pub ids_allocated: u64,
    pub index_updates: u64,
}

impl fmt::Display for StorageStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StorageStats {{ read: {}, written: {}, deleted: {}, ids: {}, index_updates: {} }}",
            self.documents_read,
            self.documents_written,
            self.documents_deleted,
            self.ids_allocated,
            self.index_updates
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let stats = StorageStats::new();
        stats.documents_read.fetch_add(3, Ordering::Relaxed);
        stats.index_updates.fetch_add(1, Ordering::Relaxed);

        let snap = stats.snapshot();
        assert_eq!(snap.documents_read, 3);
        assert_eq!(snap.index_updates, 1);
        assert!(format!("{}", snap).contains("read: 3"));

        stats.reset();
        assert_eq!(stats.snapshot(), StorageStatsSnapshot::default());
    }
}
