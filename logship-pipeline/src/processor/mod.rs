//! Processor module for the log shipper pipeline.
//!
//! Decodes raw records and reshapes them into indexable events by type.

pub mod access_log;
pub mod error_log;
mod log_processor;
pub mod time_cache;

pub use log_processor::{DecodeError, LogProcessor};
pub use time_cache::TimeParseCache;
