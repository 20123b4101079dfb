//! OpenSearch implementation of the search backend.
//!
//! This module provides a concrete implementation of `SearchBackend`
//! using the OpenSearch bulk API.

mod client;

pub use client::OpenSearchBackend;
