//! Interfaces to the log shipper's external collaborators.

mod queue_store;
mod search_backend;

pub use queue_store::QueueStore;
pub use search_backend::SearchBackend;
