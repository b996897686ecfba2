//! QueueKV - A Queue-Driven In-Memory Key-Value Store
//!
//! This is the main entry point for the QueueKV consumer.
//! It sets up logging, the queue backend, the store and the dispatch loop,
//! and turns Ctrl+C / SIGTERM into a clean shutdown.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use queuekv::consumer::{Concurrency, DispatchConfig, Dispatcher, DEFAULT_WAIT_TIME_SECS};
use queuekv::queue::{MemoryQueue, Queue};
use queuekv::storage::MemStore;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Where messages come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// In-process queue fed with newline-delimited bodies from stdin
    Memory,
    /// Amazon SQS (requires the `sqs` feature)
    Sqs,
}

/// Consumer configuration
#[derive(Debug, Parser)]
#[command(name = "queuekv", version, about = "Applies queued key-value commands to an in-memory store")]
struct Cli {
    /// Long polling wait time in seconds
    #[arg(long = "rcv-wait-time-sec", default_value_t = DEFAULT_WAIT_TIME_SECS)]
    rcv_wait_time_sec: u64,

    /// Maximum number of messages processed at once (unbounded if unset)
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Queue backend
    #[arg(long, value_enum, default_value_t = Backend::Memory)]
    backend: Backend,

    /// Queue name, resolved or created on startup (sqs backend)
    #[arg(long, env = "QUEUE_NAME")]
    queue_name: Option<String>,

    /// Visibility timeout in seconds (memory backend)
    #[arg(long = "visibility-timeout-sec", default_value_t = 30)]
    visibility_timeout_sec: u64,
}

impl Cli {
    fn dispatch_config(&self) -> DispatchConfig {
        let concurrency = match self.max_in_flight {
            Some(max) => Concurrency::Bounded(max),
            None => Concurrency::Unbounded,
        };
        DispatchConfig::with_wait_secs(self.rcv_wait_time_sec).concurrency(concurrency)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!(version = queuekv::VERSION, backend = ?cli.backend, "QueueKV consumer starting");

    let config = cli.dispatch_config();
    match config.concurrency {
        Concurrency::Unbounded => info!("Message fan-out is unbounded"),
        Concurrency::Bounded(max) => info!(max_in_flight = max, "Message fan-out is bounded"),
    }

    // Polling scope; execution units never see this token
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            shutdown.cancel();
        });
    }

    match cli.backend {
        Backend::Memory => {
            let queue = Arc::new(MemoryQueue::new(Duration::from_secs(
                cli.visibility_timeout_sec,
            )));
            spawn_stdin_feeder(Arc::clone(&queue));
            run_consumer(queue, config, shutdown).await?;
        }
        Backend::Sqs => run_sqs(&cli, config, shutdown).await?,
    }

    info!("Consumer has been stopped.");
    Ok(())
}

async fn run_consumer<Q: Queue>(
    queue: Arc<Q>,
    config: DispatchConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::new(queue, MemStore::new(), config);
    dispatcher
        .run(shutdown)
        .await
        .context("dispatch loop stopped")?;
    Ok(())
}

#[cfg(feature = "sqs")]
async fn run_sqs(
    cli: &Cli,
    config: DispatchConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    use queuekv::queue::SqsQueue;

    let queue_name = cli
        .queue_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .context("env variable QUEUE_NAME must be set")?;
    SqsQueue::wait_time_seconds(config.wait_time).context("invalid --rcv-wait-time-sec")?;
    let queue = SqsQueue::connect(queue_name)
        .await
        .context("failed to set up queue")?;
    run_consumer(Arc::new(queue), config, shutdown).await
}

#[cfg(not(feature = "sqs"))]
async fn run_sqs(
    _cli: &Cli,
    _config: DispatchConfig,
    _shutdown: CancellationToken,
) -> anyhow::Result<()> {
    anyhow::bail!("this build has no SQS support, rebuild with `--features sqs`")
}

/// Enqueues every non-empty stdin line as a message body.
///
/// Runs on a plain thread so a blocked read never holds up process exit.
fn spawn_stdin_feeder(queue: Arc<MemoryQueue>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) if line.trim().is_empty() => {}
                Ok(line) => queue.send(line),
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin, no more messages will be enqueued");
                    break;
                }
            }
        }
        info!("Stdin closed");
    });
}

/// Resolves once Ctrl+C or SIGTERM arrives.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received, stopping consumer...");
}
