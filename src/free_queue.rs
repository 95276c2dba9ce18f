//! Lock-free multi-channel SPSC sample queue.
//!
//! A [`FreeQueue`] holds `capacity + 1` slots per channel and two cursors.
//! One slot is always left empty so that `read == write` unambiguously means
//! "empty". All channels share the cursors and advance in lock-step.
//!
//! # Ownership of the cursors
//!
//! - The producer is the only writer of the write cursor
//! - The consumer is the only writer of the read cursor
//! - Publishing a cursor is a `Release` store; observing the other side's
//!   cursor is an `Acquire` load, so sample data written before a publish is
//!   visible to whoever observes it
//!
//! Exclusive operations (clear, cursor overwrite, overwriting push) take
//! `&mut self`. The producer/consumer split lives in [`crate::bridge`].

use std::cell::UnsafeCell;
use std::fmt;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::channels::{ChannelSink, ChannelSource};
use crate::config::FreeQueueConfig;
use crate::error::{FreeQueueError, Result};
use crate::sample::Sample;

/// Frames that can be pulled given a cursor snapshot.
#[inline]
pub fn available_read(read: usize, write: usize, buffer_length: usize) -> usize {
    if write >= read {
        write - read
    } else {
        write + buffer_length - read
    }
}

/// Frames that can be pushed given a cursor snapshot.
#[inline]
pub fn available_write(read: usize, write: usize, buffer_length: usize) -> usize {
    if write >= read {
        buffer_length - write + read - 1
    } else {
        read - write - 1
    }
}

/// Read and write cursors.
///
/// `repr(C)` keeps `read` at offset 0 and `write` right after it, so a foreign
/// view of this struct can index it as `state[0]` / `state[1]`.
#[repr(C)]
#[derive(Debug, Default)]
pub struct Cursors {
    read: AtomicUsize,
    write: AtomicUsize,
}

pub struct FreeQueue<T: Sample = f32> {
    buffer_length: usize,
    channel_data: Box<[Box<[UnsafeCell<T>]>]>,
    cursors: Cursors,
}

// Sample memory is only touched through `&mut self` or through the unsafe
// `*_shared` entry points, whose callers uphold the single-producer /
// single-consumer discipline.
unsafe impl<T: Sample> Send for FreeQueue<T> {}
unsafe impl<T: Sample> Sync for FreeQueue<T> {}

impl<T: Sample> FreeQueue<T> {
    /// Create a queue holding up to `capacity` frames on each of
    /// `channel_count` channels. Storage is zero-filled, both cursors start at 0.
    ///
    /// # Panics
    ///
    /// Panics if one channel of `capacity + 1` samples cannot be addressed.
    /// Use [`FreeQueue::try_new`] to handle that case.
    pub fn new(capacity: usize, channel_count: usize) -> Self {
        match Self::try_new(capacity, channel_count) {
            Ok(queue) => queue,
            Err(e) => panic!("{e}"),
        }
    }

    /// Fallible [`FreeQueue::new`]: rejects capacities whose channel storage
    /// would overflow the address space, before allocating anything.
    pub fn try_new(capacity: usize, channel_count: usize) -> Result<Self> {
        let buffer_length = capacity
            .checked_add(1)
            .filter(|len| {
                len.checked_mul(std::mem::size_of::<T>())
                    .is_some_and(|bytes| bytes <= isize::MAX as usize)
            })
            .ok_or(FreeQueueError::CapacityOverflow { capacity })?;

        let channel_data = (0..channel_count)
            .map(|_| {
                (0..buffer_length)
                    .map(|_| UnsafeCell::new(T::ZERO))
                    .collect::<Vec<_>>()
                    .into_boxed_slice()
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            buffer_length,
            channel_data,
            cursors: Cursors::default(),
        })
    }

    pub fn with_config(config: &FreeQueueConfig) -> Self {
        Self::new(config.capacity as usize, config.channel_count as usize)
    }

    pub fn try_with_config(config: &FreeQueueConfig) -> Result<Self> {
        Self::try_new(config.capacity as usize, config.channel_count as usize)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Layout
    // ─────────────────────────────────────────────────────────────────────

    /// Usable frames per channel.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer_length - 1
    }

    /// Physical slots per channel (`capacity + 1`).
    #[inline]
    pub fn buffer_length(&self) -> usize {
        self.buffer_length
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channel_data.len()
    }

    /// Base address of a channel's storage, for boundary-crossing views.
    pub fn channel_ptr(&self, channel: usize) -> Option<*mut T> {
        self.channel_data
            .get(channel)
            .map(|cells| UnsafeCell::raw_get(cells.as_ptr()))
    }

    /// Address of the cursor pair, for boundary-crossing views.
    pub fn cursors_ptr(&self) -> *const Cursors {
        &self.cursors
    }

    /// Copy of one channel's full storage, in physical order.
    pub fn channel_snapshot(&self, channel: usize) -> Option<Vec<T>> {
        let cells = self.channel_data.get(channel)?;
        // SAFETY: safe writers need `&mut self`, and a split queue is only
        // reachable through its handles. Callers of the `*_shared` writers
        // (the C ABI) must not overlap them with this read.
        Some(cells.iter().map(|cell| unsafe { *cell.get() }).collect())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Counters
    // ─────────────────────────────────────────────────────────────────────

    #[inline]
    pub fn read_counter(&self) -> usize {
        self.cursors.read.load(Ordering::Acquire)
    }

    #[inline]
    pub fn write_counter(&self) -> usize {
        self.cursors.write.load(Ordering::Acquire)
    }

    /// Frames currently readable.
    #[inline]
    pub fn available_read(&self) -> usize {
        let (read, write) = self.snapshot();
        available_read(read, write, self.buffer_length)
    }

    /// Frames currently writable.
    #[inline]
    pub fn available_write(&self) -> usize {
        let (read, write) = self.snapshot();
        available_write(read, write, self.buffer_length)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.available_read() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.available_write() == 0
    }

    /// Overwrite the read cursor. The value is reduced modulo `buffer_length`.
    pub fn set_read_counter(&mut self, counter: usize) {
        unsafe { self.set_read_counter_shared(counter) }
    }

    /// Overwrite the write cursor. The value is reduced modulo `buffer_length`.
    pub fn set_write_counter(&mut self, counter: usize) {
        unsafe { self.set_write_counter_shared(counter) }
    }

    pub fn reset_read_counter(&mut self) {
        self.set_read_counter(0);
    }

    pub fn reset_write_counter(&mut self) {
        self.set_write_counter(0);
    }

    /// Reset both cursors and zero-fill every channel.
    pub fn clear(&mut self) {
        unsafe { self.clear_shared() }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Data operations
    // ─────────────────────────────────────────────────────────────────────

    /// Push `block` frames from each input channel. All-or-nothing.
    pub fn try_push<S>(&mut self, inputs: &S, block: usize) -> Result<()>
    where
        S: ChannelSource<T> + ?Sized,
    {
        unsafe { self.push_shared(inputs, block) }
    }

    /// Push `block` frames; `false` if there is not enough room.
    pub fn push<S>(&mut self, inputs: &S, block: usize) -> bool
    where
        S: ChannelSource<T> + ?Sized,
    {
        self.try_push(inputs, block).is_ok()
    }

    /// Push `block` frames, discarding the oldest unread frames if needed.
    ///
    /// Fails only if `block` exceeds the capacity or the inputs are malformed.
    pub fn try_push_overwrite<S>(&mut self, inputs: &S, block: usize) -> Result<()>
    where
        S: ChannelSource<T> + ?Sized,
    {
        unsafe { self.push_overwrite_shared(inputs, block) }
    }

    pub fn push_overwrite<S>(&mut self, inputs: &S, block: usize) -> bool
    where
        S: ChannelSource<T> + ?Sized,
    {
        self.try_push_overwrite(inputs, block).is_ok()
    }

    /// Pull `block` frames into each output channel. All-or-nothing.
    ///
    /// With `consume == false` the read cursor is left in place (peek).
    pub fn try_pull<S>(&mut self, outputs: &mut S, block: usize, consume: bool) -> Result<usize>
    where
        S: ChannelSink<T> + ?Sized,
    {
        unsafe { self.pull_shared(outputs, block, consume) }
    }

    /// Pull `block` frames; returns `block` on success, `0` otherwise.
    pub fn pull<S>(&mut self, outputs: &mut S, block: usize, consume: bool) -> usize
    where
        S: ChannelSink<T> + ?Sized,
    {
        self.try_pull(outputs, block, consume).unwrap_or(0)
    }

    /// Pull as many of `block` frames as are available, oldest first.
    pub fn pull_up_to<S>(&mut self, outputs: &mut S, block: usize, consume: bool) -> usize
    where
        S: ChannelSink<T> + ?Sized,
    {
        unsafe { self.pull_up_to_shared(outputs, block, consume) }.unwrap_or(0)
    }

    /// Pull the newest `min(block, available)` frames.
    ///
    /// With `consume` the read cursor jumps to the write cursor, retiring
    /// older unread frames too.
    pub fn pull_latest<S>(&mut self, outputs: &mut S, block: usize, consume: bool) -> usize
    where
        S: ChannelSink<T> + ?Sized,
    {
        unsafe { self.pull_latest_shared(outputs, block, consume) }.unwrap_or(0)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Shared-reference entry points
    //
    // Used by the producer/consumer handles and by the foreign boundary,
    // where the queue is reachable from two threads at once.
    // ─────────────────────────────────────────────────────────────────────

    /// # Safety
    /// No other producer-side call may run concurrently.
    pub(crate) unsafe fn push_shared<S>(&self, inputs: &S, block: usize) -> Result<()>
    where
        S: ChannelSource<T> + ?Sized,
    {
        self.check_source(inputs, block)?;

        let read = self.cursors.read.load(Ordering::Acquire);
        let write = self.cursors.write.load(Ordering::Relaxed);

        let available = available_write(read, write, self.buffer_length);
        if available < block {
            return Err(FreeQueueError::InsufficientSpace {
                requested: block,
                available,
            });
        }

        for channel in 0..self.channel_count() {
            unsafe { self.write_channel(channel, write, &inputs.channel(channel)[..block]) };
        }

        let next_write = (write + block) % self.buffer_length;
        self.cursors.write.store(next_write, Ordering::Release);
        Ok(())
    }

    /// # Safety
    /// No producer- or consumer-side call may run concurrently: this moves
    /// the read cursor when it has to drop old frames.
    pub(crate) unsafe fn push_overwrite_shared<S>(&self, inputs: &S, block: usize) -> Result<()>
    where
        S: ChannelSource<T> + ?Sized,
    {
        if block > self.capacity() {
            return Err(FreeQueueError::BlockExceedsCapacity {
                block,
                capacity: self.capacity(),
            });
        }
        self.check_source(inputs, block)?;

        let read = self.cursors.read.load(Ordering::Acquire);
        let write = self.cursors.write.load(Ordering::Relaxed);

        let available = available_write(read, write, self.buffer_length);
        if available < block {
            let dropped = block - available;
            let next_read = (read + dropped) % self.buffer_length;
            self.cursors.read.store(next_read, Ordering::Release);
        }

        for channel in 0..self.channel_count() {
            unsafe { self.write_channel(channel, write, &inputs.channel(channel)[..block]) };
        }

        let next_write = (write + block) % self.buffer_length;
        self.cursors.write.store(next_write, Ordering::Release);
        Ok(())
    }

    /// # Safety
    /// No other consumer-side call may run concurrently.
    pub(crate) unsafe fn pull_shared<S>(&self, outputs: &mut S, block: usize, consume: bool) -> Result<usize>
    where
        S: ChannelSink<T> + ?Sized,
    {
        self.check_sink(outputs, block)?;

        let read = self.cursors.read.load(Ordering::Relaxed);
        let write = self.cursors.write.load(Ordering::Acquire);

        let available = available_read(read, write, self.buffer_length);
        if available < block {
            return Err(FreeQueueError::InsufficientData {
                requested: block,
                available,
            });
        }

        for channel in 0..self.channel_count() {
            unsafe { self.read_channel(channel, read, &mut outputs.channel_mut(channel)[..block]) };
        }

        if consume {
            let next_read = (read + block) % self.buffer_length;
            self.cursors.read.store(next_read, Ordering::Release);
        }
        Ok(block)
    }

    /// # Safety
    /// No other consumer-side call may run concurrently.
    pub(crate) unsafe fn pull_up_to_shared<S>(&self, outputs: &mut S, block: usize, consume: bool) -> Result<usize>
    where
        S: ChannelSink<T> + ?Sized,
    {
        self.check_sink(outputs, block)?;

        let read = self.cursors.read.load(Ordering::Relaxed);
        let write = self.cursors.write.load(Ordering::Acquire);
        let frames = block.min(available_read(read, write, self.buffer_length));

        for channel in 0..self.channel_count() {
            unsafe { self.read_channel(channel, read, &mut outputs.channel_mut(channel)[..frames]) };
        }

        if consume {
            let next_read = (read + frames) % self.buffer_length;
            self.cursors.read.store(next_read, Ordering::Release);
        }
        Ok(frames)
    }

    /// # Safety
    /// No other consumer-side call may run concurrently.
    pub(crate) unsafe fn pull_latest_shared<S>(&self, outputs: &mut S, block: usize, consume: bool) -> Result<usize>
    where
        S: ChannelSink<T> + ?Sized,
    {
        self.check_sink(outputs, block)?;

        let read = self.cursors.read.load(Ordering::Relaxed);
        let write = self.cursors.write.load(Ordering::Acquire);
        let frames = block.min(available_read(read, write, self.buffer_length));
        let start = (write + self.buffer_length - frames) % self.buffer_length;

        for channel in 0..self.channel_count() {
            unsafe { self.read_channel(channel, start, &mut outputs.channel_mut(channel)[..frames]) };
        }

        if consume {
            self.cursors.read.store(write, Ordering::Release);
        }
        Ok(frames)
    }

    /// # Safety
    /// Neither side may be mid-operation.
    pub(crate) unsafe fn clear_shared(&self) {
        self.cursors.read.store(0, Ordering::Release);
        self.cursors.write.store(0, Ordering::Release);
        for channel in 0..self.channel_count() {
            if let Some(base) = self.channel_ptr(channel) {
                unsafe { slice::from_raw_parts_mut(base, self.buffer_length) }.fill(T::ZERO);
            }
        }
    }

    /// # Safety
    /// No consumer-side call may run concurrently.
    pub(crate) unsafe fn set_read_counter_shared(&self, counter: usize) {
        self.cursors
            .read
            .store(counter % self.buffer_length, Ordering::Release);
    }

    /// # Safety
    /// No producer-side call may run concurrently.
    pub(crate) unsafe fn set_write_counter_shared(&self, counter: usize) {
        self.cursors
            .write
            .store(counter % self.buffer_length, Ordering::Release);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    #[inline]
    fn snapshot(&self) -> (usize, usize) {
        (
            self.cursors.read.load(Ordering::Acquire),
            self.cursors.write.load(Ordering::Acquire),
        )
    }

    fn check_source<S>(&self, inputs: &S, block: usize) -> Result<()>
    where
        S: ChannelSource<T> + ?Sized,
    {
        if inputs.channel_count() != self.channel_count() {
            return Err(FreeQueueError::ChannelMismatch {
                expected: self.channel_count(),
                actual: inputs.channel_count(),
            });
        }
        for channel in 0..self.channel_count() {
            let len = inputs.channel(channel).len();
            if len < block {
                return Err(FreeQueueError::BlockTooShort { channel, len, block });
            }
        }
        Ok(())
    }

    fn check_sink<S>(&self, outputs: &mut S, block: usize) -> Result<()>
    where
        S: ChannelSink<T> + ?Sized,
    {
        if outputs.channel_count() != self.channel_count() {
            return Err(FreeQueueError::ChannelMismatch {
                expected: self.channel_count(),
                actual: outputs.channel_count(),
            });
        }
        for channel in 0..self.channel_count() {
            let len = outputs.channel_mut(channel).len();
            if len < block {
                return Err(FreeQueueError::BlockTooShort { channel, len, block });
            }
        }
        Ok(())
    }

    /// Copy `src` into a channel starting at `start`, wrapping at the end.
    ///
    /// # Safety
    /// The target range must not be readable by the consumer.
    #[inline]
    unsafe fn write_channel(&self, channel: usize, start: usize, src: &[T]) {
        let Some(base) = self.channel_ptr(channel) else {
            return;
        };
        let head = src.len().min(self.buffer_length - start);
        let tail = src.len() - head;
        // Only the two runs being written are borrowed; the rest of the
        // channel may be under a concurrent read.
        unsafe {
            slice::from_raw_parts_mut(base.add(start), head).copy_from_slice(&src[..head]);
            slice::from_raw_parts_mut(base, tail).copy_from_slice(&src[head..]);
        }
    }

    /// Copy from a channel starting at `start` into `dst`, wrapping at the end.
    ///
    /// # Safety
    /// The source range must not be writable by the producer.
    #[inline]
    unsafe fn read_channel(&self, channel: usize, start: usize, dst: &mut [T]) {
        let Some(base) = self.channel_ptr(channel) else {
            return;
        };
        let base = base as *const T;
        let head = dst.len().min(self.buffer_length - start);
        let tail = dst.len() - head;
        unsafe {
            dst[..head].copy_from_slice(slice::from_raw_parts(base.add(start), head));
            dst[head..].copy_from_slice(slice::from_raw_parts(base, tail));
        }
    }
}

impl<T: Sample> fmt::Debug for FreeQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreeQueue")
            .field("buffer_length", &self.buffer_length)
            .field("channel_count", &self.channel_count())
            .field("read", &self.read_counter())
            .field("write", &self.write_counter())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    fn ramp(start: f32, len: usize) -> Vec<f32> {
        (0..len).map(|i| start + i as f32).collect()
    }

    fn assert_invariant<T: Sample>(queue: &FreeQueue<T>) {
        assert_eq!(
            queue.available_read() + queue.available_write(),
            queue.buffer_length() - 1
        );
        assert!(queue.read_counter() < queue.buffer_length());
        assert!(queue.write_counter() < queue.buffer_length());
    }

    #[test]
    fn test_availability_formulas() {
        assert_eq!(available_read(0, 0, 5), 0);
        assert_eq!(available_write(0, 0, 5), 4);
        assert_eq!(available_read(0, 4, 5), 4);
        assert_eq!(available_write(0, 4, 5), 0);
        assert_eq!(available_read(4, 1, 5), 2);
        assert_eq!(available_write(4, 1, 5), 2);
    }

    #[test]
    fn test_new_is_zeroed() {
        let queue = FreeQueue::<f32>::new(8, 3);
        assert_eq!(queue.capacity(), 8);
        assert_eq!(queue.buffer_length(), 9);
        assert_eq!(queue.channel_count(), 3);
        assert_eq!(queue.read_counter(), 0);
        assert_eq!(queue.write_counter(), 0);
        for ch in 0..3 {
            assert_eq!(queue.channel_snapshot(ch).unwrap(), vec![0.0; 9]);
        }
        assert!(queue.channel_snapshot(3).is_none());
    }

    #[test]
    fn test_with_config() {
        let queue = FreeQueue::<f64>::with_config(&FreeQueueConfig::new(16, 1));
        assert_eq!(queue.capacity(), 16);
        assert_eq!(queue.channel_count(), 1);
    }

    #[test]
    fn test_try_new_rejects_unaddressable_capacity() {
        assert_eq!(
            FreeQueue::<f32>::try_new(usize::MAX, 2).err(),
            Some(FreeQueueError::CapacityOverflow { capacity: usize::MAX })
        );
        let too_wide = isize::MAX as usize / 4;
        assert_eq!(
            FreeQueue::<f64>::try_new(too_wide, 1).err(),
            Some(FreeQueueError::CapacityOverflow { capacity: too_wide })
        );

        let queue = FreeQueue::<f32>::try_new(4, 2).unwrap();
        assert_eq!(queue.buffer_length(), 5);
        assert!(FreeQueue::<f32>::try_with_config(&FreeQueueConfig::new(8, 1)).is_ok());
    }

    #[test]
    fn test_mono_wrap_scenario() {
        let mut queue = FreeQueue::<f32>::new(4, 1);

        assert!(queue.push(&[[1.0, 2.0, 3.0, 4.0]], 4));
        assert_eq!(queue.write_counter(), 4);
        assert_eq!(queue.read_counter(), 0);
        assert_eq!(queue.available_write(), 0);
        assert!(queue.is_full());
        assert!(!queue.push(&[[9.0]], 1));

        let mut out = [[0.0f32; 4]];
        assert_eq!(queue.pull(&mut out, 4, true), 4);
        assert_eq!(out[0], [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(queue.read_counter(), 4);

        assert!(queue.push(&[[5.0, 6.0]], 2));
        assert_eq!(queue.write_counter(), 1);
        let storage = queue.channel_snapshot(0).unwrap();
        assert_eq!(storage[4], 5.0);
        assert_eq!(storage[0], 6.0);

        let mut out = [[0.0f32; 2]];
        assert_eq!(queue.pull(&mut out, 2, true), 2);
        assert_eq!(out[0], [5.0, 6.0]);
        assert!(queue.is_empty());
        assert_invariant(&queue);
    }

    #[test]
    fn test_channels_stay_separate() {
        let mut queue = FreeQueue::<f32>::new(3, 2);
        assert!(queue.push(&[[1.0, 2.0], [10.0, 20.0]], 2));

        let mut out = vec![vec![0.0f32; 2]; 2];
        assert_eq!(queue.pull(&mut out, 2, true), 2);
        assert_eq!(out[0], vec![1.0, 2.0]);
        assert_eq!(out[1], vec![10.0, 20.0]);
    }

    #[test]
    fn test_overflow_leaves_state_untouched() {
        let mut queue = FreeQueue::<f32>::new(4, 2);
        assert!(queue.push(&[ramp(0.0, 3), ramp(100.0, 3)], 3));
        let before = (queue.channel_snapshot(0), queue.channel_snapshot(1));

        let err = queue.try_push(&[ramp(50.0, 2), ramp(150.0, 2)], 2).unwrap_err();
        assert_eq!(
            err,
            FreeQueueError::InsufficientSpace {
                requested: 2,
                available: 1
            }
        );
        assert_eq!(queue.write_counter(), 3);
        assert_eq!(queue.read_counter(), 0);
        assert_eq!((queue.channel_snapshot(0), queue.channel_snapshot(1)), before);
    }

    #[test]
    fn test_underflow_leaves_state_untouched() {
        let mut queue = FreeQueue::<f32>::new(4, 1);
        assert!(queue.push(&[[7.0, 8.0]], 2));

        let mut out = [[-1.0f32; 3]];
        assert_eq!(queue.pull(&mut out, 3, true), 0);
        assert_eq!(out[0], [-1.0; 3]);
        assert_eq!(queue.read_counter(), 0);
        assert_eq!(queue.write_counter(), 2);
        assert!(matches!(
            queue.try_pull(&mut out, 3, true),
            Err(FreeQueueError::InsufficientData {
                requested: 3,
                available: 2
            })
        ));
    }

    #[test]
    fn test_malformed_inputs_rejected() {
        let mut queue = FreeQueue::<f32>::new(4, 2);
        assert_eq!(
            queue.try_push(&[[1.0, 2.0]], 2),
            Err(FreeQueueError::ChannelMismatch {
                expected: 2,
                actual: 1
            })
        );
        let short: [&[f32]; 2] = [&[1.0, 2.0], &[1.0]];
        assert_eq!(
            queue.try_push(&short, 2),
            Err(FreeQueueError::BlockTooShort {
                channel: 1,
                len: 1,
                block: 2
            })
        );
        assert_eq!(queue.write_counter(), 0);
    }

    #[test]
    fn test_round_trip_every_block_length() {
        const CAPACITY: usize = 6;
        for k in 0..=CAPACITY {
            let mut queue = FreeQueue::<f64>::new(CAPACITY, 3);
            let input: Vec<Vec<f64>> = (0..3)
                .map(|ch| (0..k).map(|i| (ch * 100 + i) as f64).collect())
                .collect();
            assert!(queue.push(&input, k));

            let mut out = vec![vec![0.0f64; k]; 3];
            assert_eq!(queue.pull(&mut out, k, true), k);
            assert_eq!(out, input);
            assert_invariant(&queue);
        }
    }

    #[test]
    fn test_zero_capacity_never_accepts() {
        let mut queue = FreeQueue::<f32>::new(0, 1);
        assert_eq!(queue.available_write(), 0);
        assert!(!queue.push(&[[1.0]], 1));
        assert!(queue.push(&[[0.0f32; 0]], 0));
        assert_invariant(&queue);
    }

    #[test]
    fn test_zero_channels() {
        let mut queue = FreeQueue::<f32>::new(4, 0);
        let none: [&[f32]; 0] = [];
        assert!(queue.push(&none, 3));
        assert_eq!(queue.available_read(), 3);
        let mut sink: [&mut [f32]; 0] = [];
        assert_eq!(queue.pull(&mut sink, 3, true), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_wrap_matches_reference_model() {
        const CAPACITY: usize = 7;
        let mut queue = FreeQueue::<f32>::new(CAPACITY, 2);
        let mut model: VecDeque<(f32, f32)> = VecDeque::new();
        let mut next = 0.0f32;
        let mut wraps = 0;

        // Deterministic block-length sequence that keeps crossing the end.
        let mut seed = 0x2545_f491u32;
        for _ in 0..400 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let block = (seed % 5) as usize;

            if seed & 0x100 == 0 {
                let left = ramp(next, block);
                let right: Vec<f32> = left.iter().map(|v| -v).collect();
                let before = queue.write_counter();
                let pushed = queue.push(&[left.clone(), right], block);
                assert_eq!(pushed, model.len() + block <= CAPACITY);
                if pushed {
                    model.extend(left.iter().map(|&v| (v, -v)));
                    next += block as f32;
                    if block > 0 && queue.write_counter() <= before {
                        wraps += 1;
                    }
                }
            } else {
                let mut out = vec![vec![0.0f32; block]; 2];
                let pulled = queue.pull(&mut out, block, true);
                if model.len() >= block {
                    assert_eq!(pulled, block);
                    for i in 0..block {
                        let (l, r) = model.pop_front().unwrap();
                        assert_eq!(out[0][i], l);
                        assert_eq!(out[1][i], r);
                    }
                } else {
                    assert_eq!(pulled, 0);
                }
            }
            assert_eq!(queue.available_read(), model.len());
            assert_invariant(&queue);
        }
        assert!(wraps >= 2);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut queue = FreeQueue::<f32>::new(4, 1);
        assert!(queue.push(&[[1.0, 2.0, 3.0]], 3));

        for _ in 0..3 {
            let mut out = [[0.0f32; 2]];
            assert_eq!(queue.pull(&mut out, 2, false), 2);
            assert_eq!(out[0], [1.0, 2.0]);
            assert_eq!(queue.read_counter(), 0);
        }

        let writable = queue.available_write();
        let mut out = [[0.0f32; 2]];
        assert_eq!(queue.pull(&mut out, 2, true), 2);
        assert_eq!(queue.read_counter(), 2);
        assert_eq!(queue.available_write(), writable + 2);
    }

    #[test]
    fn test_push_overwrite_drops_oldest() {
        let mut queue = FreeQueue::<f32>::new(4, 1);
        assert!(queue.push_overwrite(&[[1.0, 2.0, 3.0]], 3));
        assert!(queue.push_overwrite(&[[4.0, 5.0, 6.0]], 3));
        assert_invariant(&queue);
        assert_eq!(queue.available_read(), 4);

        let mut out = [[0.0f32; 4]];
        assert_eq!(queue.pull(&mut out, 4, true), 4);
        assert_eq!(out[0], [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_push_overwrite_rejects_oversized_block() {
        let mut queue = FreeQueue::<f32>::new(2, 1);
        assert_eq!(
            queue.try_push_overwrite(&[[1.0, 2.0, 3.0]], 3),
            Err(FreeQueueError::BlockExceedsCapacity {
                block: 3,
                capacity: 2
            })
        );
        assert_eq!(queue.write_counter(), 0);
    }

    #[test]
    fn test_pull_up_to_takes_what_is_there() {
        let mut queue = FreeQueue::<f32>::new(8, 1);
        assert!(queue.push(&[[1.0, 2.0, 3.0]], 3));

        let mut out = [[0.0f32; 5]];
        assert_eq!(queue.pull_up_to(&mut out, 5, true), 3);
        assert_eq!(out[0], [1.0, 2.0, 3.0, 0.0, 0.0]);
        assert!(queue.is_empty());
        assert_eq!(queue.pull_up_to(&mut out, 5, true), 0);
    }

    #[test]
    fn test_pull_latest_reads_newest() {
        let mut queue = FreeQueue::<f32>::new(6, 1);
        assert!(queue.push(&[ramp(1.0, 5)], 5));

        let mut out = [[0.0f32; 2]];
        assert_eq!(queue.pull_latest(&mut out, 2, false), 2);
        assert_eq!(out[0], [4.0, 5.0]);
        assert_eq!(queue.available_read(), 5);

        assert_eq!(queue.pull_latest(&mut out, 2, true), 2);
        assert!(queue.is_empty());
        assert_invariant(&queue);
    }

    #[test]
    fn test_pull_latest_across_wrap() {
        let mut queue = FreeQueue::<f32>::new(4, 1);
        queue.set_read_counter(3);
        queue.set_write_counter(3);
        assert!(queue.push(&[[1.0, 2.0, 3.0]], 3));
        assert_eq!(queue.write_counter(), 1);

        let mut out = [[0.0f32; 3]];
        assert_eq!(queue.pull_latest(&mut out, 3, true), 3);
        assert_eq!(out[0], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut queue = FreeQueue::<f32>::new(4, 2);
        assert!(queue.push(&[[1.0, 2.0], [3.0, 4.0]], 2));
        queue.clear();
        assert_eq!(queue.read_counter(), 0);
        assert_eq!(queue.write_counter(), 0);
        assert_eq!(queue.channel_snapshot(0).unwrap(), vec![0.0; 5]);
        assert_eq!(queue.channel_snapshot(1).unwrap(), vec![0.0; 5]);
    }

    #[test]
    fn test_counter_setters_wrap_into_range() {
        let mut queue = FreeQueue::<f32>::new(4, 1);
        queue.set_write_counter(7);
        assert_eq!(queue.write_counter(), 2);
        queue.set_read_counter(5);
        assert_eq!(queue.read_counter(), 0);
        assert_invariant(&queue);

        queue.reset_write_counter();
        queue.reset_read_counter();
        assert!(queue.is_empty());
    }
}
