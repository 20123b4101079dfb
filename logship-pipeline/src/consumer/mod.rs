//! Consumer module for the log shipper pipeline.
//!
//! Provides the intake stage that drains records from the queue store.

mod messages;
mod queue_consumer;

pub use messages::{RawBatch, RawRecord};
pub use queue_consumer::{IntakeConfig, QueueConsumer, DEFAULT_QUEUE_KEY};
