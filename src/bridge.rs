//! Producer/consumer handles over a shared [`FreeQueue`].
//!
//! # Architecture
//!
//! - **Producer thread** owns [`QueueProducer`] and is the only writer of the write cursor
//! - **Consumer thread** owns [`QueueConsumer`] and is the only writer of the read cursor
//! - Both handles are `Send` but not `Sync`, so each role lives on exactly one thread
//!
//! # Usage
//!
//! ```ignore
//! let (mut producer, mut consumer) = create_bridge(FreeQueue::<f32>::new(1024, 2));
//!
//! // Producer thread: retry until there is room
//! while !producer.push(&[&left[..], &right[..]], 128) {
//!     std::thread::sleep(RETRY_INTERVAL);
//! }
//!
//! // Consumer thread
//! let frames = consumer.pull(&mut [&mut out_l[..], &mut out_r[..]], 128);
//! ```

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::channels::{ChannelSink, ChannelSource};
use crate::error::Result;
use crate::free_queue::FreeQueue;
use crate::sample::Sample;

/// Write side of a split queue.
pub struct QueueProducer<T: Sample = f32> {
    queue: Arc<FreeQueue<T>>,
    _not_sync: PhantomData<Cell<()>>,
}

/// Read side of a split queue.
pub struct QueueConsumer<T: Sample = f32> {
    queue: Arc<FreeQueue<T>>,
    _not_sync: PhantomData<Cell<()>>,
}

/// Split a queue into its producer and consumer handles.
pub fn create_bridge<T: Sample>(queue: FreeQueue<T>) -> (QueueProducer<T>, QueueConsumer<T>) {
    handles(Arc::new(queue))
}

fn handles<T: Sample>(queue: Arc<FreeQueue<T>>) -> (QueueProducer<T>, QueueConsumer<T>) {
    let producer = QueueProducer {
        queue: Arc::clone(&queue),
        _not_sync: PhantomData,
    };
    let consumer = QueueConsumer {
        queue,
        _not_sync: PhantomData,
    };
    (producer, consumer)
}

/// Recover the queue once both sides are done with it.
///
/// If the handles came from different queues they are handed back untouched,
/// so each can still be paired with its own partner.
pub fn reunite<T: Sample>(
    producer: QueueProducer<T>,
    consumer: QueueConsumer<T>,
) -> std::result::Result<FreeQueue<T>, (QueueProducer<T>, QueueConsumer<T>)> {
    if !Arc::ptr_eq(&producer.queue, &consumer.queue) {
        return Err((producer, consumer));
    }
    drop(producer);
    // The handles are the only owners, so this only fails if that changes.
    Arc::try_unwrap(consumer.queue).map_err(handles)
}

impl<T: Sample> FreeQueue<T> {
    /// Shorthand for [`create_bridge`].
    pub fn split(self) -> (QueueProducer<T>, QueueConsumer<T>) {
        create_bridge(self)
    }
}

// ═══════════════════════════════════════════════════════════════════
// QueueProducer - Producer Thread API
// ═══════════════════════════════════════════════════════════════════

impl<T: Sample> QueueProducer<T> {
    /// Push `block` frames from each input channel. All-or-nothing.
    #[inline]
    pub fn try_push<S>(&mut self, inputs: &S, block: usize) -> Result<()>
    where
        S: ChannelSource<T> + ?Sized,
    {
        // SAFETY: this handle is the queue's only producer.
        unsafe { self.queue.push_shared(inputs, block) }
    }

    /// Push `block` frames; `false` if there is not enough room.
    #[inline]
    pub fn push<S>(&mut self, inputs: &S, block: usize) -> bool
    where
        S: ChannelSource<T> + ?Sized,
    {
        self.try_push(inputs, block).is_ok()
    }

    #[inline]
    pub fn available_write(&self) -> usize {
        self.queue.available_write()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.queue.channel_count()
    }

    pub fn read_counter(&self) -> usize {
        self.queue.read_counter()
    }

    pub fn write_counter(&self) -> usize {
        self.queue.write_counter()
    }
}

// ═══════════════════════════════════════════════════════════════════
// QueueConsumer - Consumer Thread API
// ═══════════════════════════════════════════════════════════════════

impl<T: Sample> QueueConsumer<T> {
    /// Pull and retire `block` frames. All-or-nothing.
    #[inline]
    pub fn try_pull<S>(&mut self, outputs: &mut S, block: usize) -> Result<usize>
    where
        S: ChannelSink<T> + ?Sized,
    {
        // SAFETY: this handle is the queue's only consumer.
        unsafe { self.queue.pull_shared(outputs, block, true) }
    }

    /// Pull and retire `block` frames; returns `0` if not enough are ready.
    #[inline]
    pub fn pull<S>(&mut self, outputs: &mut S, block: usize) -> usize
    where
        S: ChannelSink<T> + ?Sized,
    {
        self.try_pull(outputs, block).unwrap_or(0)
    }

    /// Copy `block` frames without retiring them.
    #[inline]
    pub fn peek<S>(&mut self, outputs: &mut S, block: usize) -> usize
    where
        S: ChannelSink<T> + ?Sized,
    {
        unsafe { self.queue.pull_shared(outputs, block, false) }.unwrap_or(0)
    }

    pub fn pull_up_to<S>(&mut self, outputs: &mut S, block: usize, consume: bool) -> usize
    where
        S: ChannelSink<T> + ?Sized,
    {
        unsafe { self.queue.pull_up_to_shared(outputs, block, consume) }.unwrap_or(0)
    }

    pub fn pull_latest<S>(&mut self, outputs: &mut S, block: usize, consume: bool) -> usize
    where
        S: ChannelSink<T> + ?Sized,
    {
        unsafe { self.queue.pull_latest_shared(outputs, block, consume) }.unwrap_or(0)
    }

    #[inline]
    pub fn available_read(&self) -> usize {
        self.queue.available_read()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.queue.channel_count()
    }

    pub fn read_counter(&self) -> usize {
        self.queue.read_counter()
    }

    pub fn write_counter(&self) -> usize {
        self.queue.write_counter()
    }
}
