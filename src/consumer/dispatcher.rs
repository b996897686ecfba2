//! Dispatch Loop
//!
//! The dispatcher pulls batches from a [`Queue`] and fans each valid message
//! out to its own Tokio task, which applies the command to the store and then
//! acknowledges the message.
//!
//! ## Loop Lifecycle
//!
//! ```text
//! 1. Polling: one long-poll receive (blocks only this loop)
//!        │
//!        ├── cancelled ──────────────> Shutdown (Ok)
//!        ├── transport error ────────> Stop (Err)
//!        ▼
//! 2. For each message in the batch
//!    ┌──────────────────────────────┐
//!    │ decode + validate            │──── invalid ──> log, leave on queue
//!    └───────────┬──────────────────┘
//!                │ spawn (fire-and-forget)
//!                ▼
//!    ┌──────────────────────────────┐
//!    │ execution unit               │
//!    │   execute against MemStore   │
//!    │   acknowledge (never         │
//!    │   cancelled)                 │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 3. Back to Polling without waiting for the units
//! ```
//!
//! ## Cancellation Scopes
//!
//! The `CancellationToken` handed to [`Dispatcher::run`] only races the
//! receive call. Execution units never see it, so a shutdown cannot abort an
//! acknowledgment that is already under way. Units are not awaited on
//! shutdown either.
//!
//! ## Ordering
//!
//! Units race each other. Two commands for the same key in one batch may be
//! applied in either order; only each single store operation is atomic.

use crate::commands::CommandHandler;
use crate::protocol::decode_message;
use crate::queue::{Queue, QueueError, ReceivedMessage};
use crate::storage::MemStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Largest batch requested per receive (the SQS maximum)
pub const MAX_MESSAGES_PER_RECEIVE: usize = 10;

/// Default long-poll wait time in seconds
pub const DEFAULT_WAIT_TIME_SECS: u64 = 20;

/// How many execution units may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    /// Spawn one unit per valid message with no cap. The poller never waits
    /// for units, so in-flight work can grow without limit under load.
    #[default]
    Unbounded,
    /// At most this many units in flight. The poller waits for a free slot
    /// before spawning the next one.
    Bounded(usize),
}

/// Dispatch loop configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Long-poll wait per receive
    pub wait_time: Duration,
    /// Messages requested per receive, clamped to `1..=10`
    pub max_messages: usize,
    pub concurrency: Concurrency,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            wait_time: Duration::from_secs(DEFAULT_WAIT_TIME_SECS),
            max_messages: MAX_MESSAGES_PER_RECEIVE,
            concurrency: Concurrency::Unbounded,
        }
    }
}

impl DispatchConfig {
    /// Default configuration with the given wait time.
    pub fn with_wait_secs(secs: u64) -> Self {
        Self {
            wait_time: Duration::from_secs(secs),
            ..Default::default()
        }
    }

    /// Replaces the concurrency policy.
    pub fn concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// The batch size actually requested from the queue.
    pub fn batch_size(&self) -> usize {
        self.max_messages.clamp(1, MAX_MESSAGES_PER_RECEIVE)
    }
}

/// Counters for the dispatch loop
#[derive(Debug, Default)]
pub struct DispatchStats {
    /// Receive calls that returned a batch (possibly empty)
    pub batches_received: AtomicU64,
    /// Messages across all batches
    pub messages_received: AtomicU64,
    /// Messages skipped as malformed or invalid (left on the queue)
    pub messages_rejected: AtomicU64,
    /// Execution units spawned
    pub units_spawned: AtomicU64,
    /// Commands that reached the store
    pub commands_executed: AtomicU64,
    /// Commands with an unrecognized name
    pub commands_unsupported: AtomicU64,
    pub acks_succeeded: AtomicU64,
    pub acks_failed: AtomicU64,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn batch_received(&self, count: usize) {
        self.batches_received.fetch_add(1, Ordering::Relaxed);
        self.messages_received
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    fn message_rejected(&self) {
        self.messages_rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn unit_spawned(&self) {
        self.units_spawned.fetch_add(1, Ordering::Relaxed);
    }

    fn command_executed(&self, supported: bool) {
        if supported {
            self.commands_executed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.commands_unsupported.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn ack_finished(&self, ok: bool) {
        if ok {
            self.acks_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.acks_failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Errors that end the dispatch loop.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A receive failed for a reason other than cancellation
    #[error("failed to receive messages: {0}")]
    Receive(#[source] QueueError),
}

/// Microseconds since the Unix epoch, taken when a message is accepted.
pub fn receipt_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

/// Continuously receives messages and executes them against its store.
///
/// The dispatcher owns the store; execution units share it through the
/// command handler.
pub struct Dispatcher<Q: Queue + ?Sized> {
    queue: Arc<Q>,
    handler: CommandHandler,
    config: DispatchConfig,
    limiter: Option<Arc<Semaphore>>,
    stats: Arc<DispatchStats>,
}

impl<Q: Queue + ?Sized> Dispatcher<Q> {
    /// Creates a dispatcher over `queue`, taking ownership of `store`.
    pub fn new(queue: Arc<Q>, store: MemStore, config: DispatchConfig) -> Self {
        let limiter = match config.concurrency {
            Concurrency::Unbounded => None,
            Concurrency::Bounded(max) => Some(Arc::new(Semaphore::new(max.max(1)))),
        };

        Self {
            queue,
            handler: CommandHandler::new(Arc::new(store)),
            config,
            limiter,
            stats: Arc::new(DispatchStats::new()),
        }
    }

    pub fn store(&self) -> &MemStore {
        self.handler.store()
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Runs the loop until `shutdown` is cancelled or a receive fails.
    ///
    /// Returns `Ok(())` on cancellation, whether observed through the token
    /// or reported by the queue as [`QueueError::Cancelled`]. In-flight
    /// execution units keep running after this returns.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), DispatchError> {
        let wait_secs = self.config.wait_time.as_secs();
        let batch_size = self.config.batch_size();

        loop {
            info!(wait_secs, "Receiving messages...");

            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => Err(QueueError::Cancelled),
                result = self.queue.receive(batch_size, self.config.wait_time) => result,
            };

            let messages = match received {
                Ok(messages) => messages,
                Err(QueueError::Cancelled) => {
                    info!("Receive cancelled, stopping dispatch loop");
                    return Ok(());
                }
                Err(e) => return Err(DispatchError::Receive(e)),
            };

            self.stats.batch_received(messages.len());
            info!(count = messages.len(), "Received messages");

            for message in messages {
                if !self.dispatch(message, &shutdown).await {
                    info!("Shutdown while waiting for a free slot, stopping dispatch loop");
                    return Ok(());
                }
            }
        }
    }

    /// Validates one message and spawns its execution unit.
    ///
    /// Returns `false` if shutdown was requested while waiting for a slot.
    async fn dispatch(&self, message: ReceivedMessage, shutdown: &CancellationToken) -> bool {
        let ReceivedMessage {
            body,
            receipt_handle,
        } = message;

        let command = match decode_message(&body) {
            Ok(command) => command,
            Err(e) if e.is_malformed() => {
                error!(receipt = %receipt_handle, error = %e, "Unsupported message format");
                self.stats.message_rejected();
                return true;
            }
            Err(e) => {
                error!(receipt = %receipt_handle, error = %e, "Message is invalid");
                self.stats.message_rejected();
                return true;
            }
        };
        debug!(?command, "Message");

        let timestamp = receipt_timestamp();

        let permit = match self.acquire_slot(shutdown).await {
            Ok(permit) => permit,
            Err(()) => return false,
        };

        let handler = self.handler.clone();
        let queue = Arc::clone(&self.queue);
        let stats = Arc::clone(&self.stats);

        self.stats.unit_spawned();
        tokio::spawn(async move {
            let _permit = permit;

            let outcome = handler.execute(command, timestamp);
            stats.command_executed(outcome.is_store_operation());

            // Deliberately outside the shutdown scope
            match queue.acknowledge(&receipt_handle).await {
                Ok(()) => stats.ack_finished(true),
                Err(e) => {
                    stats.ack_finished(false);
                    error!(receipt = %receipt_handle, error = %e, "Failed to delete message");
                }
            }
        });

        true
    }

    /// Waits for a free slot under `Concurrency::Bounded`.
    async fn acquire_slot(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<Option<OwnedSemaphorePermit>, ()> {
        let Some(limiter) = &self.limiter else {
            return Ok(None);
        };

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(()),
            permit = Arc::clone(limiter).acquire_owned() => Ok(permit.ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryQueue;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio_test::assert_ok;

    type Batch = Result<Vec<ReceivedMessage>, QueueError>;

    /// Replays scripted receive results, then reports cancellation
    /// (or blocks forever with `hold_when_drained`).
    #[derive(Default)]
    struct ScriptedQueue {
        batches: Mutex<VecDeque<Batch>>,
        receive_calls: AtomicUsize,
        acks: Mutex<Vec<String>>,
        fail_acks: bool,
        hold_when_drained: bool,
        ack_delay: Duration,
        acks_in_flight: AtomicUsize,
        max_acks_in_flight: AtomicUsize,
    }

    impl ScriptedQueue {
        fn new(batches: Vec<Batch>) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
                ..Default::default()
            }
        }

        fn acks(&self) -> Vec<String> {
            self.acks.lock().unwrap().clone()
        }

        fn receive_calls(&self) -> usize {
            self.receive_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Queue for ScriptedQueue {
        async fn receive(
            &self,
            max_messages: usize,
            _wait: Duration,
        ) -> Result<Vec<ReceivedMessage>, QueueError> {
            self.receive_calls.fetch_add(1, Ordering::SeqCst);
            assert!(max_messages <= MAX_MESSAGES_PER_RECEIVE);
            let next = self.batches.lock().unwrap().pop_front();
            match next {
                Some(batch) => batch,
                None if self.hold_when_drained => std::future::pending().await,
                None => Err(QueueError::Cancelled),
            }
        }

        async fn acknowledge(&self, receipt_handle: &str) -> Result<(), QueueError> {
            let current = self.acks_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_acks_in_flight.fetch_max(current, Ordering::SeqCst);

            if !self.ack_delay.is_zero() {
                tokio::time::sleep(self.ack_delay).await;
            }
            self.acks_in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_acks {
                return Err(QueueError::Transport("delete refused".into()));
            }
            self.acks.lock().unwrap().push(receipt_handle.to_string());
            Ok(())
        }
    }

    fn msg(body: &str, receipt: &str) -> ReceivedMessage {
        ReceivedMessage::new(body.to_string(), receipt)
    }

    fn dispatcher(queue: &Arc<ScriptedQueue>, config: DispatchConfig) -> Dispatcher<ScriptedQueue> {
        Dispatcher::new(Arc::clone(queue), MemStore::new(), config)
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_batch_with_malformed_message() {
        let queue = Arc::new(ScriptedQueue::new(vec![Ok(vec![
            msg(r#"{"command":"addItem","key":"k1","value":"v1"}"#, "rh-1"),
            msg(r#"{"command":"deleteItem","key":"k2"}"#, "rh-2"),
            msg(r#"{"command":"getItem","key":"k3"}"#, "rh-3"),
            msg(r#"{"command":"addItem","key":"#, "rh-4"),
        ])]));
        let dispatcher = dispatcher(&queue, DispatchConfig::default());

        assert_ok!(dispatcher.run(CancellationToken::new()).await);
        wait_until(|| queue.acks().len() == 3).await;

        let mut acks = queue.acks();
        acks.sort();
        assert_eq!(acks, vec!["rh-1", "rh-2", "rh-3"]);

        let stats = dispatcher.store().stats();
        assert_eq!(stats.total_ops(), 3);
        assert_eq!((stats.add_ops, stats.delete_ops, stats.get_ops), (1, 1, 1));
        assert_eq!(dispatcher.store().get("k1").unwrap().value, "v1");

        let dispatch = dispatcher.stats();
        assert_eq!(dispatch.messages_received.load(Ordering::Relaxed), 4);
        assert_eq!(dispatch.messages_rejected.load(Ordering::Relaxed), 1);
        assert_eq!(dispatch.units_spawned.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_queue_cancellation_is_clean_stop() {
        let queue = Arc::new(ScriptedQueue::new(vec![Err(QueueError::Cancelled)]));
        let dispatcher = dispatcher(&queue, DispatchConfig::default());

        assert_ok!(dispatcher.run(CancellationToken::new()).await);
        assert_eq!(queue.receive_calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_receive() {
        let queue = Arc::new(ScriptedQueue::new(vec![Ok(vec![msg(
            r#"{"command":"addItem","key":"k","value":"v"}"#,
            "rh-1",
        )])]));
        let dispatcher = dispatcher(&queue, DispatchConfig::default());

        let token = CancellationToken::new();
        token.cancel();

        assert_ok!(dispatcher.run(token).await);
        assert_eq!(queue.receive_calls(), 0);
        assert!(dispatcher.store().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let queue = Arc::new(ScriptedQueue::new(vec![
            Ok(vec![]),
            Err(QueueError::Transport("connection refused".into())),
            Ok(vec![]),
        ]));
        let dispatcher = dispatcher(&queue, DispatchConfig::default());

        let err = dispatcher.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Receive(QueueError::Transport(ref reason)) if reason == "connection refused"
        ));
        assert_eq!(
            err.to_string(),
            "failed to receive messages: transport error: connection refused"
        );
        assert_eq!(queue.receive_calls(), 2);
    }

    #[tokio::test]
    async fn test_invalid_messages_are_not_acknowledged() {
        let queue = Arc::new(ScriptedQueue::new(vec![Ok(vec![
            msg(r#"{"command":"","key":"x"}"#, "rh-1"),
            msg(r#"{"command":"addItem","key":""}"#, "rh-2"),
            msg(r#"{"command":"getAllItems","key":""}"#, "rh-3"),
        ])]));
        let dispatcher = dispatcher(&queue, DispatchConfig::default());

        assert_ok!(dispatcher.run(CancellationToken::new()).await);
        wait_until(|| queue.acks().len() == 1).await;

        assert_eq!(queue.acks(), vec!["rh-3"]);
        assert_eq!(dispatcher.store().stats().dump_ops, 1);
        assert_eq!(
            dispatcher.stats().messages_rejected.load(Ordering::Relaxed),
            2
        );
    }

    #[tokio::test]
    async fn test_non_object_body_is_not_acknowledged() {
        let queue = Arc::new(ScriptedQueue::new(vec![Ok(vec![
            msg(r#"["addItem","k1","v1"]"#, "rh-1"),
            msg(r#"{"Command":"addItem","Key":"k2","Value":"v2"}"#, "rh-2"),
        ])]));
        let dispatcher = dispatcher(&queue, DispatchConfig::default());

        assert_ok!(dispatcher.run(CancellationToken::new()).await);
        wait_until(|| queue.acks().len() == 1).await;

        assert_eq!(queue.acks(), vec!["rh-2"]);
        assert!(dispatcher.store().get("k1").is_none());
        assert_eq!(dispatcher.store().get("k2").unwrap().value, "v2");
        assert_eq!(
            dispatcher.stats().messages_rejected.load(Ordering::Relaxed),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_ack_survives_shutdown() {
        let mut queue = ScriptedQueue::new(vec![Ok(vec![msg(
            r#"{"command":"addItem","key":"k","value":"v"}"#,
            "rh-1",
        )])]);
        queue.ack_delay = Duration::from_secs(3);
        queue.hold_when_drained = true;
        let queue = Arc::new(queue);
        let dispatcher = Arc::new(dispatcher(&queue, DispatchConfig::default()));

        let token = CancellationToken::new();
        let runner = {
            let dispatcher = Arc::clone(&dispatcher);
            let token = token.clone();
            tokio::spawn(async move { dispatcher.run(token).await })
        };

        // The unit is sleeping inside acknowledge and the loop is polling again
        wait_until(|| queue.acks_in_flight.load(Ordering::SeqCst) == 1).await;
        wait_until(|| queue.receive_calls() == 2).await;
        assert!(queue.acks().is_empty());

        token.cancel();
        assert_ok!(runner.await.unwrap());
        assert!(queue.acks().is_empty());

        // Cancelling the loop does not abort the pending delete
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(queue.acks(), vec!["rh-1"]);
        assert_eq!(dispatcher.stats().acks_succeeded.load(Ordering::Relaxed), 1);
        assert_eq!(dispatcher.store().get("k").unwrap().value, "v");
    }

    #[tokio::test]
    async fn test_unsupported_command_is_acknowledged() {
        let queue = Arc::new(ScriptedQueue::new(vec![Ok(vec![msg(
            r#"{"command":"renameItem","key":"k","value":"v"}"#,
            "rh-1",
        )])]));
        let dispatcher = dispatcher(&queue, DispatchConfig::default());

        assert_ok!(dispatcher.run(CancellationToken::new()).await);
        wait_until(|| queue.acks().len() == 1).await;

        assert_eq!(dispatcher.store().stats().total_ops(), 0);
        let stats = dispatcher.stats();
        assert_eq!(stats.commands_unsupported.load(Ordering::Relaxed), 1);
        assert_eq!(stats.commands_executed.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_failed_acknowledgment_is_not_fatal() {
        let mut queue = ScriptedQueue::new(vec![
            Ok(vec![msg(r#"{"command":"addItem","key":"a","value":"1"}"#, "rh-1")]),
            Ok(vec![msg(r#"{"command":"addItem","key":"b","value":"2"}"#, "rh-2")]),
        ]);
        queue.fail_acks = true;
        let queue = Arc::new(queue);
        let dispatcher = dispatcher(&queue, DispatchConfig::default());

        assert_ok!(dispatcher.run(CancellationToken::new()).await);
        assert_eq!(queue.receive_calls(), 3);

        let stats = dispatcher.stats();
        wait_until(|| stats.acks_failed.load(Ordering::Relaxed) == 2).await;
        assert_eq!(stats.acks_succeeded.load(Ordering::Relaxed), 0);

        // The store operations still happened
        assert_eq!(dispatcher.store().len(), 2);
    }

    #[tokio::test]
    async fn test_unbounded_fan_out() {
        let batch = (0..6)
            .map(|i| {
                msg(
                    &format!(r#"{{"command":"addItem","key":"k{}","value":"v"}}"#, i),
                    &format!("rh-{}", i),
                )
            })
            .collect();
        let mut queue = ScriptedQueue::new(vec![Ok(batch)]);
        queue.ack_delay = Duration::from_millis(50);
        let queue = Arc::new(queue);
        let dispatcher = dispatcher(&queue, DispatchConfig::default());

        // Returns without waiting for the slow acknowledgments
        assert_ok!(dispatcher.run(CancellationToken::new()).await);
        assert!(queue.acks().len() < 6);

        wait_until(|| queue.acks().len() == 6).await;
        assert!(queue.max_acks_in_flight.load(Ordering::SeqCst) > 2);
    }

    #[tokio::test]
    async fn test_bounded_concurrency_caps_in_flight_units() {
        let batch = (0..6)
            .map(|i| {
                msg(
                    &format!(r#"{{"command":"addItem","key":"k{}","value":"v"}}"#, i),
                    &format!("rh-{}", i),
                )
            })
            .collect();
        let mut queue = ScriptedQueue::new(vec![Ok(batch)]);
        queue.ack_delay = Duration::from_millis(20);
        let queue = Arc::new(queue);
        let config = DispatchConfig::default().concurrency(Concurrency::Bounded(2));
        let dispatcher = dispatcher(&queue, config);

        assert_ok!(dispatcher.run(CancellationToken::new()).await);
        wait_until(|| queue.acks().len() == 6).await;

        assert!(queue.max_acks_in_flight.load(Ordering::SeqCst) <= 2);
        assert_eq!(dispatcher.store().len(), 6);
    }

    #[tokio::test]
    async fn test_shutdown_while_waiting_for_slot() {
        let batch = vec![
            msg(r#"{"command":"addItem","key":"a","value":"1"}"#, "rh-1"),
            msg(r#"{"command":"addItem","key":"b","value":"2"}"#, "rh-2"),
        ];
        let mut queue = ScriptedQueue::new(vec![Ok(batch)]);
        queue.ack_delay = Duration::from_secs(30);
        let queue = Arc::new(queue);
        let config = DispatchConfig::default().concurrency(Concurrency::Bounded(1));
        let dispatcher = dispatcher(&queue, config);

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        assert_ok!(dispatcher.run(token).await);

        // Only the first message got a unit; the second stays on the queue
        assert_eq!(dispatcher.stats().units_spawned.load(Ordering::Relaxed), 1);
        assert!(queue.acks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_message_is_redelivered() {
        let queue = Arc::new(MemoryQueue::new(Duration::from_secs(5)));
        queue.send(r#"{"command":"addItem","key":"k1","value":"v1"}"#);
        queue.send("not json");
        queue.send(r#"["addItem","k2","v2"]"#);

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&queue),
            MemStore::new(),
            DispatchConfig::with_wait_secs(1),
        ));

        let token = CancellationToken::new();
        let runner = {
            let dispatcher = Arc::clone(&dispatcher);
            let token = token.clone();
            tokio::spawn(async move { dispatcher.run(token).await })
        };

        wait_until(|| queue.len() == 2).await;
        tokio::time::sleep(Duration::from_secs(12)).await;

        // Malformed messages are never acknowledged and keep coming back
        assert_eq!(queue.len(), 2);
        assert!(queue.max_receive_count() >= 2);
        assert_eq!(dispatcher.store().get("k1").unwrap().value, "v1");
        assert!(dispatcher.store().get("k2").is_none());

        token.cancel();
        assert_ok!(runner.await.unwrap());
    }

    #[test]
    fn test_config_batch_size_clamped() {
        let mut config = DispatchConfig::default();
        assert_eq!(config.batch_size(), 10);

        config.max_messages = 50;
        assert_eq!(config.batch_size(), 10);

        config.max_messages = 0;
        assert_eq!(config.batch_size(), 1);
    }

    #[test]
    fn test_receipt_timestamp_is_microseconds() {
        let ts = receipt_timestamp();
        // Later than 2020-01-01 in microseconds
        assert!(ts > 1_577_836_800_000_000);
    }
}
