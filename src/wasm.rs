//! WebAssembly bindings via wasm-bindgen for browser integration.
//!
//! This module is only compiled when the `web` feature is enabled.
//!
//! # Usage
//!
//! Build with wasm-pack:
//! ```bash
//! wasm-pack build --target web --features web
//! ```
//!
//! # JavaScript Example
//!
//! ```javascript
//! import init, { freequeue_init, WasmFreeQueue } from './freequeue.js';
//!
//! const wasm = await init();
//! freequeue_init();
//!
//! const queue = new WasmFreeQueue(1764, 2);
//!
//! // Planar block: [L0..L127, R0..R127]
//! const block = new Float32Array(256);
//! if (!queue.push(block, 128)) {
//!   // full: retry later
//! }
//!
//! // Shared-memory views
//! const mem = wasm.memory.buffer;
//! const length = new Uint32Array(mem, queue.buffer_length_ptr(), 1)[0];
//! const state = new Uint32Array(mem, queue.state_ptr(), 2); // [read, write]
//! const left = new Float32Array(mem, queue.channel_ptr(0), length);
//! ```

use wasm_bindgen::prelude::*;

use crate::channels::{PlanarBlock, PlanarBlockMut};
use crate::config::FreeQueueConfig;
use crate::diagnostics;
use crate::free_queue::FreeQueue;

// ═══════════════════════════════════════════════════════════════════════════
// Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the wasm module. Call this once before using any other functions.
/// Sets up panic hooks and console logging.
#[wasm_bindgen]
pub fn freequeue_init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
}

/// Default capacity in frames.
#[wasm_bindgen]
pub fn default_capacity() -> u32 {
    FreeQueueConfig::default().capacity
}

/// Default channel count.
#[wasm_bindgen]
pub fn default_channel_count() -> u32 {
    FreeQueueConfig::default().channel_count
}

// ═══════════════════════════════════════════════════════════════════════════
// Queue
// ═══════════════════════════════════════════════════════════════════════════

/// Scalar fields a JS view reads from linear memory, one u32 each.
#[repr(C)]
struct LayoutFields {
    buffer_length: u32,
    channel_count: u32,
}

/// Multi-channel sample queue. Blocks are passed in planar layout.
#[wasm_bindgen]
pub struct WasmFreeQueue {
    inner: FreeQueue<f32>,
    // Boxed so the addresses handed to JS stay put.
    layout: Box<LayoutFields>,
}

#[wasm_bindgen]
impl WasmFreeQueue {
    /// Create a queue holding `capacity` frames on each of `channel_count` channels.
    #[wasm_bindgen(constructor)]
    pub fn new(capacity: u32, channel_count: u32) -> Result<WasmFreeQueue, JsError> {
        let config = FreeQueueConfig::new(capacity, channel_count);
        let inner = FreeQueue::try_with_config(&config)?;
        log::debug!(
            "created queue: {} frames x {} channels",
            config.capacity,
            config.channel_count
        );
        let layout = Box::new(LayoutFields {
            buffer_length: inner.buffer_length() as u32,
            channel_count: inner.channel_count() as u32,
        });
        Ok(Self { inner, layout })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Data
    // ─────────────────────────────────────────────────────────────────────────

    /// Push `block_length` frames per channel from a planar buffer.
    pub fn push(&mut self, planar: &[f32], block_length: u32) -> bool {
        let frames = block_length as usize;
        match PlanarBlock::new(planar, self.inner.channel_count(), frames) {
            Some(block) => self.inner.push(&block, frames),
            None => false,
        }
    }

    /// Push, dropping the oldest unread frames when full.
    pub fn push_overwrite(&mut self, planar: &[f32], block_length: u32) -> bool {
        let frames = block_length as usize;
        match PlanarBlock::new(planar, self.inner.channel_count(), frames) {
            Some(block) => self.inner.push_overwrite(&block, frames),
            None => false,
        }
    }

    /// Pull `block_length` frames per channel into a planar buffer.
    /// Returns the frame count, or 0 if not enough frames are ready.
    pub fn pull(&mut self, planar: &mut [f32], block_length: u32, consume: bool) -> u32 {
        let frames = block_length as usize;
        let channels = self.inner.channel_count();
        match PlanarBlockMut::new(planar, channels, frames) {
            Some(mut block) => self.inner.pull(&mut block, frames, consume) as u32,
            None => 0,
        }
    }

    /// Pull up to `block_length` frames, oldest first.
    pub fn pull_up_to(&mut self, planar: &mut [f32], block_length: u32, consume: bool) -> u32 {
        let frames = block_length as usize;
        let channels = self.inner.channel_count();
        match PlanarBlockMut::new(planar, channels, frames) {
            Some(mut block) => self.inner.pull_up_to(&mut block, frames, consume) as u32,
            None => 0,
        }
    }

    /// Pull the newest frames, up to `block_length`.
    pub fn pull_latest(&mut self, planar: &mut [f32], block_length: u32, consume: bool) -> u32 {
        let frames = block_length as usize;
        let channels = self.inner.channel_count();
        match PlanarBlockMut::new(planar, channels, frames) {
            Some(mut block) => self.inner.pull_latest(&mut block, frames, consume) as u32,
            None => 0,
        }
    }

    /// Reset both cursors and zero-fill every channel.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Counters
    // ─────────────────────────────────────────────────────────────────────────

    pub fn get_read_counter(&self) -> u32 {
        self.inner.read_counter() as u32
    }

    pub fn get_write_counter(&self) -> u32 {
        self.inner.write_counter() as u32
    }

    pub fn set_read_counter(&mut self, counter: u32) {
        self.inner.set_read_counter(counter as usize);
    }

    pub fn set_write_counter(&mut self, counter: u32) {
        self.inner.set_write_counter(counter as usize);
    }

    pub fn available_read(&self) -> u32 {
        self.inner.available_read() as u32
    }

    pub fn available_write(&self) -> u32 {
        self.inner.available_write() as u32
    }

    pub fn capacity(&self) -> u32 {
        self.inner.capacity() as u32
    }

    pub fn buffer_length(&self) -> u32 {
        self.inner.buffer_length() as u32
    }

    pub fn channel_count(&self) -> u32 {
        self.inner.channel_count() as u32
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shared-memory layout
    // ─────────────────────────────────────────────────────────────────────────

    /// Address of the buffer length (u32).
    pub fn buffer_length_ptr(&self) -> usize {
        &self.layout.buffer_length as *const u32 as usize
    }

    /// Address of the channel count (u32).
    pub fn channel_count_ptr(&self) -> usize {
        &self.layout.channel_count as *const u32 as usize
    }

    /// Address of the cursor pair (`[read, write]`, one u32 each on wasm32).
    pub fn state_ptr(&self) -> usize {
        self.inner.cursors_ptr() as usize
    }

    /// Address of a channel's `buffer_length` samples, or 0 if out of range.
    pub fn channel_ptr(&self, channel: u32) -> usize {
        self.inner
            .channel_ptr(channel as usize)
            .map_or(0, |p| p as usize)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Diagnostics
    // ─────────────────────────────────────────────────────────────────────────

    /// Log channel contents and cursor state to the console.
    pub fn print_info(&self) {
        diagnostics::log_info(&self.inner);
    }

    /// Log cursor and channel addresses to the console.
    pub fn print_addresses(&self) {
        diagnostics::log_addresses(&self.inner);
    }
}
