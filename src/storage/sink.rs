//! Dump Sinks
//!
//! `MemStore::dump_all` does the snapshot and ordering; where each entry goes
//! is decided by an [`EntrySink`]. The default [`LogSink`] writes one debug
//! line per entry. [`RecordingSink`] keeps entries in memory.

use crate::storage::engine::StoreEntry;
use std::sync::Mutex;
use tracing::debug;

/// Receives entries from a store dump, one call per entry, in dump order.
pub trait EntrySink: Send + Sync {
    fn write(&self, entry: &StoreEntry);
}

/// Logs each entry as `key -> value @timestamp`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EntrySink for LogSink {
    fn write(&self, entry: &StoreEntry) {
        debug!("{} -> {} @{}", entry.key, entry.value, entry.timestamp);
    }
}

/// Collects dumped entries.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<StoreEntry>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything written so far.
    pub fn entries(&self) -> Vec<StoreEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Drops everything written so far.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl EntrySink for RecordingSink {
    fn write(&self, entry: &StoreEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}
