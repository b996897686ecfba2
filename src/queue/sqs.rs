//! Amazon SQS Backend
//!
//! Maps `ReceiveMessage` and `DeleteMessage` onto the [`Queue`] trait.
//! Credentials and region come from the default AWS provider chain
//! (environment variables, `~/.aws`, instance metadata, ...).

use crate::queue::{Queue, QueueError, ReceivedMessage};
use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;
use bytes::Bytes;
use std::time::Duration;
use tracing::{info, warn};

/// Largest batch SQS hands out per receive
const SQS_MAX_MESSAGES: usize = 10;

/// Longest long-poll SQS accepts, in seconds
const SQS_MAX_WAIT_SECS: u64 = 20;

/// A queue backed by Amazon SQS.
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    /// Wraps an existing client and queue URL.
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Loads the default AWS configuration and resolves `queue_name`,
    /// creating the queue if it does not exist yet.
    pub async fn connect(queue_name: &str) -> Result<Self, QueueError> {
        let config = aws_config::load_from_env().await;
        let client = Client::new(&config);
        let queue_url = get_or_create_queue(&client, queue_name).await?;
        info!(queue_url = %queue_url, "Resolved queue");
        Ok(Self::new(client, queue_url))
    }

    /// Converts a long-poll wait into SQS's `WaitTimeSeconds`.
    ///
    /// SQS accepts at most 20 seconds. Longer waits are refused rather than
    /// shortened so a misconfigured consumer fails at startup.
    pub fn wait_time_seconds(wait: Duration) -> Result<i32, QueueError> {
        let secs = wait.as_secs();
        if secs > SQS_MAX_WAIT_SECS {
            return Err(QueueError::InvalidRequest(format!(
                "long-poll wait of {}s exceeds the SQS maximum of {}s",
                secs, SQS_MAX_WAIT_SECS
            )));
        }
        Ok(secs as i32)
    }
}

async fn get_or_create_queue(client: &Client, queue_name: &str) -> Result<String, QueueError> {
    match client.get_queue_url().queue_name(queue_name).send().await {
        Ok(output) => output
            .queue_url()
            .map(str::to_owned)
            .ok_or_else(|| QueueError::Transport("queue URL missing from response".into())),
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_queue_does_not_exist()) =>
        {
            info!(queue = %queue_name, "Queue does not exist, creating it");
            let output = client
                .create_queue()
                .queue_name(queue_name)
                .send()
                .await
                .map_err(|e| {
                    QueueError::Transport(format!(
                        "failed to create queue: {}",
                        DisplayErrorContext(&e)
                    ))
                })?;
            output
                .queue_url()
                .map(str::to_owned)
                .ok_or_else(|| QueueError::Transport("queue URL missing from response".into()))
        }
        Err(err) => Err(QueueError::Transport(format!(
            "failed to get queue info: {}",
            DisplayErrorContext(&err)
        ))),
    }
}

#[async_trait]
impl Queue for SqsQueue {
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let max = max_messages.clamp(1, SQS_MAX_MESSAGES) as i32;
        let wait_secs = Self::wait_time_seconds(wait)?;

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max)
            .wait_time_seconds(wait_secs)
            .send()
            .await
            .map_err(|e| QueueError::Transport(DisplayErrorContext(&e).to_string()))?;

        let batch = output
            .messages()
            .iter()
            .filter_map(|message| match message.receipt_handle() {
                Some(receipt) => {
                    let body = message.body().unwrap_or_default();
                    Some(ReceivedMessage::new(Bytes::from(body.to_owned()), receipt))
                }
                None => {
                    warn!(message_id = ?message.message_id(), "Delivery without receipt handle");
                    None
                }
            })
            .collect();

        Ok(batch)
    }

    async fn acknowledge(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::Transport(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}
