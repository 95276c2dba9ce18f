// src/lib.rs
//
// Library entry point: lock-free multi-channel sample queue plus its C and
// WebAssembly boundaries.

mod bridge;
mod channels;
mod config;
mod diagnostics;
mod error;
mod free_queue;
mod sample;

pub mod ffi;

#[cfg(feature = "web")]
pub mod wasm;

// Re-export key types for Rust consumers
pub use bridge::{QueueConsumer, QueueProducer, create_bridge, reunite};
pub use channels::{ChannelSink, ChannelSource, PlanarBlock, PlanarBlockMut};
pub use config::{DEFAULT_CAPACITY, DEFAULT_CHANNEL_COUNT, FreeQueueConfig};
pub use diagnostics::{QueueAddresses, QueueInfo, log_addresses, log_info};
pub use error::{FreeQueueError, Result};
pub use free_queue::{Cursors, FreeQueue, available_read, available_write};
pub use sample::Sample;
