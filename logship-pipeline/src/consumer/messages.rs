//! Message types emitted by the intake stage.

/// One encoded record as read from the queue store.
pub type RawRecord = Vec<u8>;

/// A batch of encoded records, in the order the store returned them.
pub type RawBatch = Vec<RawRecord>;
