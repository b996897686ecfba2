//! Thread-Safe In-Memory Store
//!
//! This module implements the key-value store that queue commands mutate.
//! Every entry carries the receipt timestamp of the `addItem` that wrote it.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, we use multiple shards to reduce contention.
//! 2. **RwLock per shard**: Concurrent readers, exclusive writers, no caller-side locking.
//! 3. **Per-key atomicity only**: `add`, `delete` and `get` each take one shard lock.
//!    `dump_all` visits shards one at a time, so it can observe a mix of states
//!    while writes are in flight.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        MemStore                             │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are distributed across shards using a hash function.
//! Last-write-wins follows execution order: whichever `add` takes the shard
//! lock last owns the entry, regardless of the timestamps involved.

use crate::storage::sink::{EntrySink, LogSink};
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Number of shards for the store.
const NUM_SHARDS: usize = 64;

/// A live key-value pair and the receipt time of the write that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub key: String,
    pub value: String,
    /// Microseconds since the Unix epoch at message receipt
    pub timestamp: i64,
}

impl StoreEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, timestamp: i64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            timestamp,
        }
    }
}

/// A single shard containing a portion of the entries.
#[derive(Debug, Default)]
struct Shard {
    data: RwLock<HashMap<String, StoreEntry>>,
}

/// Store statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub keys: u64,
    pub add_ops: u64,
    pub delete_ops: u64,
    pub get_ops: u64,
    pub dump_ops: u64,
}

impl StorageStats {
    /// Total number of store operations performed.
    pub fn total_ops(&self) -> u64 {
        self.add_ops + self.delete_ops + self.get_ops + self.dump_ops
    }
}

/// The in-memory key-value store.
///
/// Designed to be wrapped in an `Arc` and shared with every execution unit
/// the dispatcher spawns. All operations are thread-safe.
///
/// # Example
///
/// ```
/// use queuekv::storage::MemStore;
///
/// let store = MemStore::new();
///
/// store.add("name", "Ariz", 1);
/// let entry = store.get("name").unwrap();
/// assert_eq!(entry.value, "Ariz");
/// assert_eq!(entry.timestamp, 1);
///
/// store.delete("name");
/// assert!(store.get("name").is_none());
/// ```
pub struct MemStore {
    shards: Vec<Shard>,

    /// Where `dump_all` sends entries
    sink: Arc<dyn EntrySink>,

    key_count: AtomicU64,
    add_count: AtomicU64,
    delete_count: AtomicU64,
    get_count: AtomicU64,
    dump_count: AtomicU64,
}

impl std::fmt::Debug for MemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemStore")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .field("add_count", &self.add_count.load(Ordering::Relaxed))
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    /// Creates a store that dumps entries to the log.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(LogSink))
    }

    /// Creates a store that dumps entries to the given sink.
    pub fn with_sink(sink: Arc<dyn EntrySink>) -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            sink,
            key_count: AtomicU64::new(0),
            add_count: AtomicU64::new(0),
            delete_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            dump_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, key: &str) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Upserts the entry for `key`.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new key was created, `false` if an existing entry was replaced.
    pub fn add(&self, key: impl Into<String>, value: impl Into<String>, timestamp: i64) -> bool {
        self.add_count.fetch_add(1, Ordering::Relaxed);

        let key = key.into();
        let entry = StoreEntry::new(key.clone(), value, timestamp);

        let shard = self.get_shard(&key);
        let mut data = shard.data.write().unwrap();

        let is_new = data.insert(key, entry).is_none();
        if is_new {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }

        is_new
    }

    /// Removes the entry for `key` if present.
    ///
    /// # Returns
    ///
    /// Returns `true` if an entry was removed. Deleting an absent key is not an error.
    pub fn delete(&self, key: &str) -> bool {
        self.delete_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.get_shard(key);
        let mut data = shard.data.write().unwrap();

        if data.remove(key).is_some() {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Point lookup.
    ///
    /// `None` is the "not found" result: no value and a zero timestamp.
    pub fn get(&self, key: &str) -> Option<StoreEntry> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.get_shard(key);
        let data = shard.data.read().unwrap();
        data.get(key).cloned()
    }

    /// Copies every present entry, ordered by ascending timestamp.
    ///
    /// Ties are broken by key. Shards are read one after another, so the
    /// result is not a point-in-time snapshot of the whole store.
    pub fn snapshot(&self) -> Vec<StoreEntry> {
        let mut entries = Vec::with_capacity(self.len() as usize);

        for shard in &self.shards {
            let data = shard.data.read().unwrap();
            entries.extend(data.values().cloned());
        }

        entries.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.key.cmp(&b.key))
        });
        entries
    }

    /// Feeds every present entry, in timestamp order, to the store's sink.
    ///
    /// # Returns
    ///
    /// Returns the number of entries written.
    pub fn dump_all(&self) -> usize {
        self.dump_into(self.sink.as_ref())
    }

    /// Like [`dump_all`](Self::dump_all) but writes to an explicit sink.
    pub fn dump_into(&self, sink: &dyn EntrySink) -> usize {
        self.dump_count.fetch_add(1, Ordering::Relaxed);

        let entries = self.snapshot();
        for entry in &entries {
            sink.write(entry);
        }
        entries.len()
    }

    /// Returns the approximate number of keys in the store.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.key_count.load(Ordering::Relaxed),
            add_ops: self.add_count.load(Ordering::Relaxed),
            delete_ops: self.delete_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            dump_ops: self.dump_count.load(Ordering::Relaxed),
        }
    }
}
