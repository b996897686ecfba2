//! Consumer Module
//!
//! This module runs the message dispatch loop: one sequential polling task
//! feeding an open-ended set of per-message execution units.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Dispatcher                            │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │   receive   │───>│  validate   │───>│ spawn unit  │──┐  │
//! │  └─────────────┘    └─────────────┘    └─────────────┘  │  │
//! │         ▲                                               │  │
//! │         └───────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                                                 │
//!                          ┌──────────────────────┴──────────┐
//!                          ▼                                 ▼
//!                 ┌─────────────────┐              ┌─────────────────┐
//!                 │ CommandHandler  │              │  acknowledge    │
//!                 │   → MemStore    │              │ (no shutdown)   │
//!                 └─────────────────┘              └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use queuekv::consumer::{DispatchConfig, Dispatcher};
//! use queuekv::queue::MemoryQueue;
//! use queuekv::storage::MemStore;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let queue = Arc::new(MemoryQueue::default());
//! let dispatcher = Dispatcher::new(queue, MemStore::new(), DispatchConfig::with_wait_secs(20));
//!
//! let shutdown = CancellationToken::new();
//! dispatcher.run(shutdown.clone()).await?;
//! ```

pub mod dispatcher;

pub use dispatcher::{
    receipt_timestamp, Concurrency, DispatchConfig, DispatchError, DispatchStats, Dispatcher,
    DEFAULT_WAIT_TIME_SECS, MAX_MESSAGES_PER_RECEIVE,
};
