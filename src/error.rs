//! Error types for the free queue.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FreeQueueError {
    #[error("insufficient space: requested {requested} frames, {available} writable")]
    InsufficientSpace { requested: usize, available: usize },

    #[error("insufficient data: requested {requested} frames, {available} readable")]
    InsufficientData { requested: usize, available: usize },

    #[error("expected {expected} channel buffers, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("channel {channel} holds {len} samples, block needs {block}")]
    BlockTooShort {
        channel: usize,
        len: usize,
        block: usize,
    },

    #[error("block of {block} frames exceeds queue capacity {capacity}")]
    BlockExceedsCapacity { block: usize, capacity: usize },

    #[error("capacity of {capacity} frames cannot be allocated")]
    CapacityOverflow { capacity: usize },

    #[error("unknown field: {0}")]
    UnknownField(String),
}

pub type Result<T> = std::result::Result<T, FreeQueueError>;
