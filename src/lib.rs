//! # QueueKV - A Queue-Driven In-Memory Key-Value Store
//!
//! QueueKV is a long-running worker that pulls command messages from a durable
//! queue and applies them to an in-memory key-value store. A message is
//! acknowledged (deleted from the queue) only after its command has been
//! attempted.
//!
//! ## Features
//!
//! - **Long Polling**: One outstanding receive at a time, up to 10 messages per batch
//! - **Concurrent Fan-Out**: Each valid message runs in its own Tokio task
//! - **Sharded Storage**: RwLock-per-shard map, atomic per key
//! - **At-Least-Once**: Malformed messages stay on the queue and are redelivered
//! - **Clean Shutdown**: Cancellation stops polling; acknowledgments already
//!   under way are never cancelled
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              QueueKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   Queue     │───>│ Dispatcher  │───>│  Command    │                  │
//! │  │ (receive)   │    │ (poll loop) │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │         ▲                  │ spawn            │                         │
//! │         │                  ▼                  ▼                         │
//! │         │           ┌─────────────┐   ┌──────────────────────────────┐  │
//! │         └───────────│ acknowledge │   │          MemStore            │  │
//! │                     └─────────────┘   │ ┌────────┐ ┌────────┐ ┌────┐ │  │
//! │                                       │ │Shard 0 │ │Shard 1 │ │... │ │  │
//! │                                       │ └────────┘ └────────┘ └────┘ │  │
//! │                                       └──────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use queuekv::consumer::{DispatchConfig, Dispatcher};
//! use queuekv::queue::MemoryQueue;
//! use queuekv::storage::MemStore;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let queue = Arc::new(MemoryQueue::default());
//!     queue.send(r#"{"command":"addItem","key":"name","value":"Ariz"}"#);
//!
//!     let dispatcher = Dispatcher::new(queue, MemStore::new(), DispatchConfig::default());
//!     dispatcher.run(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Message Format
//!
//! ```text
//! {"command": "addItem" | "deleteItem" | "getItem" | "getAllItems",
//!  "key": "...", "value": "..."}
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: Command decoding and validation
//! - [`storage`]: Thread-safe store and dump sinks
//! - [`commands`]: Applies commands to the store
//! - [`queue`]: Queue abstraction and backends
//! - [`consumer`]: The dispatch loop

pub mod commands;
pub mod consumer;
pub mod protocol;
pub mod queue;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{CommandHandler, Outcome};
pub use consumer::{Concurrency, DispatchConfig, DispatchError, Dispatcher};
pub use protocol::{decode_message, Command, CommandError, CommandKind};
pub use queue::{MemoryQueue, Queue, QueueError, ReceivedMessage};
pub use storage::{EntrySink, LogSink, MemStore, StoreEntry};

/// Version of QueueKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
