//! Queue store consumer for the log shipper.
//!
//! Drains records pushed by log producers onto a list in the queue store
//! and forwards them to the pipeline in batches.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info, instrument, trace, warn};

use crate::consumer::messages::RawBatch;
use crate::errors::PipelineError;
use crate::stage::{Ports, Stage};
use logship_repository::QueueStore;

/// Default list key producers push records onto.
pub const DEFAULT_QUEUE_KEY: &str = "logs";

/// Configuration for the intake stage.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Key of the list in the queue store.
    pub key: String,
    /// How long a single blocking pop waits for a record.
    pub block_timeout: Duration,
    /// Upper bound on the records read alongside each popped record.
    pub extra_batch_size: usize,
    /// Pause after a failed pop before the next round.
    pub error_backoff: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_QUEUE_KEY.to_string(),
            block_timeout: Duration::from_secs(1),
            extra_batch_size: 1000,
            error_backoff: Duration::from_secs(1),
        }
    }
}

/// Intake stage reading from a [`QueueStore`].
///
/// Each round blocks for one record, then reads up to `extra_batch_size`
/// queued records without removing them and emits them followed by the
/// popped record. Records that were only range-read stay in the store, so
/// they can be delivered again in a later round.
pub struct QueueConsumer {
    store: Arc<dyn QueueStore>,
    config: IntakeConfig,
    ports: Ports<Infallible, RawBatch>,
    shutdown: Option<broadcast::Receiver<()>>,
}

impl QueueConsumer {
    /// Create a consumer for `key` with default settings.
    pub fn new(store: Arc<dyn QueueStore>, key: impl Into<String>) -> Self {
        Self::with_config(
            store,
            IntakeConfig {
                key: key.into(),
                ..IntakeConfig::default()
            },
        )
    }

    pub fn with_config(store: Arc<dyn QueueStore>, config: IntakeConfig) -> Self {
        Self {
            store,
            config,
            ports: Ports::default(),
            shutdown: None,
        }
    }

    /// Stop the run loop when a value is broadcast on `shutdown`.
    pub fn listen_for_shutdown(&mut self, shutdown: broadcast::Receiver<()>) {
        self.shutdown = Some(shutdown);
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Run one intake round.
    ///
    /// Returns `None` when the pop timed out or failed. A failed pop is
    /// followed by `error_backoff` before returning.
    #[instrument(skip(self), fields(key = %self.config.key))]
    pub async fn next_batch(&self) -> Option<RawBatch> {
        let popped = match self
            .store
            .block_pop(&self.config.key, self.config.block_timeout)
            .await
        {
            Ok(Some(record)) => record,
            Ok(None) => {
                trace!("No record before timeout");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to pop from queue store; skipping round");
                tokio::time::sleep(self.config.error_backoff).await;
                return None;
            }
        };

        let mut batch = self.read_backlog().await;
        batch.push(popped);

        debug!(count = batch.len(), "Read batch from queue store");
        Some(batch)
    }

    /// Read queued records without removing them.
    async fn read_backlog(&self) -> RawBatch {
        if self.config.extra_batch_size == 0 {
            return Vec::new();
        }

        let stop = isize::try_from(self.config.extra_batch_size - 1).unwrap_or(isize::MAX);
        match self.store.range(&self.config.key, 0, stop).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Failed to read queued records; emitting popped record only");
                Vec::new()
            }
        }
    }
}

/// Whether a shutdown value arrived or every sender is gone.
///
/// Without a receiver shutdown is never requested.
fn shutdown_requested(shutdown: &mut Option<broadcast::Receiver<()>>) -> bool {
    match shutdown {
        Some(receiver) => !matches!(receiver.try_recv(), Err(TryRecvError::Empty)),
        None => false,
    }
}

#[async_trait]
impl Stage for QueueConsumer {
    type Input = Infallible;
    type Output = RawBatch;

    fn name(&self) -> &'static str {
        "intake"
    }

    fn ports(&mut self) -> &mut Ports<Infallible, RawBatch> {
        &mut self.ports
    }

    async fn run(&mut self) -> Result<(), PipelineError> {
        let name = self.name();
        let outbound = self.ports.take_outbound(name);
        let mut shutdown = self.shutdown.take();

        info!(key = %self.config.key, "Starting queue consumer");

        // Rounds always run to completion: a popped record exists nowhere
        // else. The pop timeout bounds how long shutdown waits.
        while !shutdown_requested(&mut shutdown) {
            if let Some(batch) = self.next_batch().await {
                outbound.send(batch).await?;
            }
        }

        info!("Consumer received shutdown signal");

        Ok(())
    }
}
