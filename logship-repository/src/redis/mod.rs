//! Redis implementation of the queue store.

mod client;

pub use client::RedisQueueStore;
