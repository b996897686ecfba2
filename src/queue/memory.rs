//! In-Process Queue
//!
//! A small at-least-once queue that behaves like a hosted one from the
//! consumer's point of view:
//!
//! - `receive` long-polls: it returns as soon as at least one message is
//!   visible, or an empty batch once the wait time runs out.
//! - Every delivery gets a fresh receipt handle and hides the message for
//!   the visibility timeout.
//! - A message that is not acknowledged in time becomes visible again.
//! - Acknowledging with a stale or unknown handle is a no-op.

use crate::queue::{Queue, QueueError, ReceivedMessage};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::trace;

/// Default visibility timeout (30 seconds, same as SQS)
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct StoredMessage {
    id: u64,
    body: Bytes,
    visible_at: Instant,
    /// Handle of the current delivery, if any
    receipt: Option<String>,
    receive_count: u32,
}

#[derive(Debug, Default)]
struct Inner {
    messages: VecDeque<StoredMessage>,
    next_id: u64,
    next_delivery: u64,
}

/// An in-memory queue with visibility timeouts.
///
/// # Example
///
/// ```
/// use queuekv::queue::{MemoryQueue, Queue};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let queue = MemoryQueue::new(Duration::from_secs(30));
/// queue.send(r#"{"command":"getAllItems"}"#);
///
/// let batch = queue.receive(10, Duration::ZERO).await.unwrap();
/// assert_eq!(batch.len(), 1);
///
/// queue.acknowledge(&batch[0].receipt_handle).await.unwrap();
/// assert!(queue.is_empty());
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryQueue {
    inner: Mutex<Inner>,
    arrivals: Notify,
    visibility_timeout: Duration,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new(DEFAULT_VISIBILITY_TIMEOUT)
    }
}

impl MemoryQueue {
    /// Creates an empty queue with the given visibility timeout.
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            arrivals: Notify::new(),
            visibility_timeout,
        }
    }

    /// Enqueues a message, immediately visible.
    pub fn send(&self, body: impl Into<Bytes>) {
        {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.messages.push_back(StoredMessage {
                id,
                body: body.into(),
                visible_at: Instant::now(),
                receipt: None,
                receive_count: 0,
            });
        }
        self.arrivals.notify_one();
    }

    /// Number of messages stored, visible or not.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().messages.len()
    }

    /// Returns true if no messages are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of messages currently hidden by a delivery.
    pub fn in_flight(&self) -> usize {
        let now = Instant::now();
        self.inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.visible_at > now)
            .count()
    }

    /// Highest number of times any stored message has been delivered.
    pub fn max_receive_count(&self) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .map(|m| m.receive_count)
            .max()
            .unwrap_or(0)
    }

    /// Hands out up to `max` visible messages.
    ///
    /// Also returns the earliest time a hidden message becomes visible again.
    fn take_visible(&self, max: usize) -> (Vec<ReceivedMessage>, Option<Instant>) {
        let now = Instant::now();
        let hidden_until = now + self.visibility_timeout;

        let mut inner = self.inner.lock().unwrap();
        let Inner {
            messages,
            next_delivery,
            ..
        } = &mut *inner;

        let mut batch = Vec::new();
        let mut next_visible: Option<Instant> = None;

        for message in messages.iter_mut() {
            if message.visible_at <= now {
                if batch.len() == max {
                    continue;
                }
                let handle = format!("{}-{}", message.id, *next_delivery);
                *next_delivery += 1;

                message.visible_at = hidden_until;
                message.receipt = Some(handle.clone());
                message.receive_count += 1;
                batch.push(ReceivedMessage::new(message.body.clone(), handle));
            } else {
                next_visible = Some(match next_visible {
                    Some(t) => t.min(message.visible_at),
                    None => message.visible_at,
                });
            }
        }

        (batch, next_visible)
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let max = max_messages.max(1);
        let deadline = Instant::now() + wait;

        loop {
            let (batch, next_visible) = self.take_visible(max);
            if !batch.is_empty() {
                trace!(count = batch.len(), "Delivered messages");
                return Ok(batch);
            }

            if Instant::now() >= deadline {
                return Ok(batch);
            }

            let wake_at = next_visible.map_or(deadline, |t| t.min(deadline));
            tokio::select! {
                _ = self.arrivals.notified() => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn acknowledge(&self, receipt_handle: &str) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().unwrap();

        let position = inner
            .messages
            .iter()
            .position(|m| m.receipt.as_deref() == Some(receipt_handle));

        match position {
            Some(index) => {
                inner.messages.remove(index);
                trace!(receipt = %receipt_handle, "Message deleted");
            }
            None => {
                trace!(receipt = %receipt_handle, "No delivery matches receipt handle");
            }
        }

        Ok(())
    }
}
