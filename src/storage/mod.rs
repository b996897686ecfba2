//! Storage Module
//!
//! This module provides the in-memory key-value store mutated by queue commands.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        MemStore                             │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │ dump_all (timestamp order)
//!                            ▼
//!              ┌───────────────────────────┐
//!              │   EntrySink (LogSink, …)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **Ordered Dump**: Entries are emitted by ascending receipt timestamp
//! - **Pluggable Sink**: The dump destination is an injected `EntrySink`
//!
//! Nothing is persisted; the store lives as long as the process.
//!
//! ## Example
//!
//! ```
//! use queuekv::storage::{MemStore, RecordingSink};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(RecordingSink::new());
//! let store = MemStore::with_sink(sink.clone());
//!
//! store.add("b", "2", 20);
//! store.add("a", "1", 10);
//! store.dump_all();
//!
//! let keys: Vec<_> = sink.entries().into_iter().map(|e| e.key).collect();
//! assert_eq!(keys, vec!["a", "b"]);
//! ```

pub mod engine;
pub mod sink;

// Re-export commonly used types
pub use engine::{MemStore, StorageStats, StoreEntry};
pub use sink::{EntrySink, LogSink, RecordingSink};
