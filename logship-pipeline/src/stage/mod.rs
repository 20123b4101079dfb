//! Stage abstraction for the pipeline.
//!
//! A stage is an independently scheduled unit of work with one inbound and
//! one outbound channel. Stages are wired to their downstream neighbor
//! before the pipeline starts; after that, ownership of every batch moves
//! from producer to consumer at the channel handoff.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::PipelineError;

/// Default number of batches a channel between two stages can hold.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// The channel endpoints owned by a stage.
///
/// Channels are bounded: a slow downstream stage suspends its upstream
/// neighbor at send time instead of letting batches pile up in memory.
pub struct Ports<I, O> {
    inbound: Option<mpsc::Receiver<I>>,
    outbound: Option<mpsc::Sender<O>>,
    capacity: usize,
}

impl<I, O> Ports<I, O> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inbound: None,
            outbound: None,
            capacity: capacity.max(1),
        }
    }

    /// Capacity of the outbound channel created by the next `subscribe`.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
    }

    /// Create the outbound channel and hand out its receiving end.
    ///
    /// Subscribing again replaces the previous outbound channel.
    pub fn subscribe(&mut self) -> mpsc::Receiver<O> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.outbound = Some(tx);
        rx
    }

    /// Use `inbound` as this stage's inbound channel.
    pub fn attach(&mut self, inbound: mpsc::Receiver<I>) {
        self.inbound = Some(inbound);
    }

    /// Take the inbound receiver for the run loop.
    pub fn take_inbound(&mut self, stage: &'static str) -> Result<mpsc::Receiver<I>, PipelineError> {
        self.inbound.take().ok_or(PipelineError::Unwired(stage))
    }

    /// Take the outbound sender for the run loop.
    ///
    /// Dropping the returned value closes the downstream stage's inbound.
    pub fn take_outbound(&mut self, stage: &'static str) -> Outbound<O> {
        Outbound {
            sender: self.outbound.take(),
            stage,
        }
    }
}

impl<I, O> Default for Ports<I, O> {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Sending side of a stage, as used inside its run loop.
///
/// A stage with no downstream neighbor is terminal; its output is discarded.
pub struct Outbound<O> {
    sender: Option<mpsc::Sender<O>>,
    stage: &'static str,
}

impl<O> Outbound<O> {
    /// Hand `item` to the downstream stage, waiting for room if the channel is full.
    pub async fn send(&self, item: O) -> Result<(), PipelineError> {
        match &self.sender {
            Some(sender) => sender.send(item).await.map_err(|_| {
                PipelineError::channel(format!("downstream of `{}` is closed", self.stage))
            }),
            None => Ok(()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.sender.is_some()
    }
}

/// A unit of concurrent work in the pipeline.
///
/// A stage must not assume who feeds its inbound channel, only that items
/// arrive in FIFO order. `run` is started once; an error returned from it is
/// fatal to the whole pipeline.
#[async_trait]
pub trait Stage: Send + 'static {
    /// Items received on the inbound channel.
    type Input: Send + 'static;
    /// Items emitted on the outbound channel.
    type Output: Send + 'static;

    /// Stage name used in logs and errors.
    fn name(&self) -> &'static str;

    fn ports(&mut self) -> &mut Ports<Self::Input, Self::Output>;

    /// Connect this stage's outbound channel as `downstream`'s inbound channel.
    ///
    /// Must be called before either stage runs.
    fn wire<D>(&mut self, downstream: &mut D)
    where
        D: Stage<Input = Self::Output>,
        Self: Sized,
    {
        let receiver = self.ports().subscribe();
        downstream.ports().attach(receiver);
        debug!(from = self.name(), to = downstream.name(), "Wired stages");
    }

    /// Run the stage's loop.
    ///
    /// Stages with an inbound channel return `Ok(())` once it closes and
    /// every received item has been handled; the outbound channel is closed
    /// on return so shutdown flows downstream.
    async fn run(&mut self) -> Result<(), PipelineError>;
}
