//! # Logship Repository
//!
//! Interfaces to the two external collaborators of the log shipper, plus
//! concrete implementations:
//!
//! - [`QueueStore`]: a list-like blocking-pop store, backed by Redis
//! - [`SearchBackend`]: a bulk-indexing search engine, backed by OpenSearch

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod redis;
pub mod types;

pub use config::{OpenSearchConfig, RedisConfig};
pub use errors::{QueueError, SearchError};
pub use interfaces::{QueueStore, SearchBackend};
pub use self::opensearch::OpenSearchBackend;
pub use self::redis::RedisQueueStore;
pub use types::{BulkItemFailure, BulkSummary};
