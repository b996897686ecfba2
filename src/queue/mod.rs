//! Message Queue Abstraction
//!
//! The consumer only needs two operations from a durable, at-least-once queue:
//!
//! - `receive`: long-poll for up to `max_messages` messages, waiting up to
//!   `wait` when none are available
//! - `acknowledge`: delete one delivery by its receipt handle
//!
//! A received message stays hidden for the queue's visibility timeout.
//! If it is not acknowledged in that window it becomes visible again and
//! is redelivered with a new receipt handle.
//!
//! ## Backends
//!
//! - [`MemoryQueue`]: in-process queue with visibility timeouts
//! - `SqsQueue`: Amazon SQS (cargo feature `sqs`)

pub mod memory;
#[cfg(feature = "sqs")]
pub mod sqs;

pub use memory::MemoryQueue;
#[cfg(feature = "sqs")]
pub use sqs::SqsQueue;

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// One delivery of a queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// The raw payload
    pub body: Bytes,
    /// Token that acknowledges this particular delivery
    pub receipt_handle: String,
}

impl ReceivedMessage {
    pub fn new(body: impl Into<Bytes>, receipt_handle: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            receipt_handle: receipt_handle.into(),
        }
    }
}

/// Errors reported by a queue backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The call was abandoned because shutdown was requested
    #[error("operation cancelled")]
    Cancelled,

    /// The backend could not be reached or rejected the request
    #[error("transport error: {0}")]
    Transport(String),

    /// The request falls outside what the backend accepts
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl QueueError {
    /// Returns true if this error only signals cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueueError::Cancelled)
    }
}

/// The queue operations the consumer depends on.
#[async_trait]
pub trait Queue: Send + Sync + 'static {
    /// Long-polls for up to `max_messages` messages.
    ///
    /// Returns an empty batch if nothing arrived within `wait`.
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Deletes the delivery identified by `receipt_handle`.
    async fn acknowledge(&self, receipt_handle: &str) -> Result<(), QueueError>;
}

