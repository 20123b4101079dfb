//! # Logship Pipeline
//!
//! This crate provides the pipeline stages that move log records from a
//! queue store into a search backend.
//!
//! ## Architecture
//!
//! The pipeline follows the Consumer-Processor-Loader pattern, with every
//! component running as an independent [`Stage`](stage::Stage):
//!
//! 1. **Consumer** (intake): drains the queue store in batches
//! 2. **Processor** (normalization): decodes and reshapes each event by type
//! 3. **Loader** (delivery): bulk indexes documents into the search backend
//! 4. **Orchestrator**: wires the stages, runs them and coordinates shutdown

pub mod consumer;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;
pub mod stage;

pub use errors::PipelineError;
