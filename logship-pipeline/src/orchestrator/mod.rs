//! Orchestrator module for the log shipper pipeline.
//!
//! Wires the consumer, processor, and loader stages together and manages
//! their lifecycle.

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::consumer::QueueConsumer;
use crate::errors::PipelineError;
use crate::loader::SearchLoader;
use crate::processor::LogProcessor;
use crate::stage::{Stage, DEFAULT_CHANNEL_CAPACITY};

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Batches each inter-stage channel can hold.
    pub channel_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Orchestrator that owns the pipeline stages until they are started.
///
/// Shutdown flows in one direction: the consumer stops on the shutdown
/// signal and closes its outbound channel, and every later stage finishes
/// what it has received before exiting.
pub struct Orchestrator {
    consumer: QueueConsumer,
    processor: LogProcessor,
    loader: SearchLoader,
    shutdown_tx: broadcast::Sender<()>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given stages.
    pub fn new(consumer: QueueConsumer, processor: LogProcessor, loader: SearchLoader) -> Self {
        Self::with_config(consumer, processor, loader, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        mut consumer: QueueConsumer,
        mut processor: LogProcessor,
        mut loader: SearchLoader,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        consumer.ports().set_capacity(config.channel_capacity);
        processor.ports().set_capacity(config.channel_capacity);
        consumer.listen_for_shutdown(shutdown_tx.subscribe());

        consumer.wire(&mut processor);
        processor.wire(&mut loader);

        Self {
            consumer,
            processor,
            loader,
            shutdown_tx,
        }
    }

    /// Spawn every stage as its own task.
    pub fn start(self) -> RunningPipeline {
        info!("Starting log shipper pipeline");

        let stages = vec![
            spawn_stage(self.consumer),
            spawn_stage(self.processor),
            spawn_stage(self.loader),
        ];

        RunningPipeline {
            stages,
            shutdown_tx: self.shutdown_tx,
        }
    }

    /// Run the pipeline until Ctrl-C or a stage failure, then drain.
    #[instrument(skip(self))]
    pub async fn run_until_signal(self) -> Result<(), PipelineError> {
        let running = self.start();
        let shutdown_tx = running.shutdown_tx.clone();

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
                let _ = shutdown_tx.send(());
            }
        });

        let result = running.wait().await;
        info!("Orchestrator shutdown complete");
        result
    }
}

fn spawn_stage<S: Stage>(mut stage: S) -> (&'static str, JoinHandle<Result<(), PipelineError>>) {
    let name = stage.name();
    let handle = tokio::spawn(async move { stage.run().await });
    (name, handle)
}

/// Handle to a started pipeline.
pub struct RunningPipeline {
    stages: Vec<(&'static str, JoinHandle<Result<(), PipelineError>>)>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RunningPipeline {
    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Wait for every stage to finish.
    ///
    /// The first stage failure triggers shutdown of the rest and is
    /// returned once they have all stopped.
    pub async fn wait(self) -> Result<(), PipelineError> {
        let mut running: FuturesUnordered<_> = self
            .stages
            .into_iter()
            .map(|(name, handle)| async move { (name, handle.await) })
            .collect();

        let mut first_error = None;

        while let Some((stage, outcome)) = running.next().await {
            let result = match outcome {
                Ok(result) => result,
                Err(e) => Err(PipelineError::StageTaskFailed {
                    stage,
                    reason: e.to_string(),
                }),
            };

            match result {
                Ok(()) => info!(stage, "Stage finished"),
                Err(e) => {
                    error!(stage, error = %e, "Stage failed; shutting down pipeline");
                    let _ = self.shutdown_tx.send(());
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
