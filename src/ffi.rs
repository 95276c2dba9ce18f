// C-compatible FFI bindings for embedding hosts (C/C++, Swift, Emscripten glue).
//
// Safety requirements:
// - All handles must be created by `fq_create*` and not fabricated
// - Channel pointer tables must hold `channel_count` entries, each pointing at
//   `block_length` samples
// - Exactly one thread may act as producer and one as consumer; the
//   exclusive functions (clear, counter setters, overwrite push) must not run
//   concurrently with either
// - Caller must call `fq_destroy` for each `fq_create*` and must not use the
//   handle afterwards

use std::ffi::{CStr, c_char, c_void};
use std::ptr;
use std::slice;
use std::str::FromStr;

use crate::channels::{ChannelSink, ChannelSource};
use crate::config::FreeQueueConfig;
use crate::diagnostics::{self, QueueAddresses};
use crate::error::FreeQueueError;
use crate::free_queue::{Cursors, FreeQueue};

use log::{debug, warn};

// Logger subsystem identifier
#[cfg(feature = "ios")]
const LOG_SUBSYSTEM: &str = "com.freequeue.core";

// ═══════════════════════════════════════════════════════════════════════════
// Logger Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the oslog logger.
///
/// Call once at startup so `fq_print_info` / `fq_print_addresses` output shows
/// up in Console.app and Xcode's debug console.
#[cfg(feature = "ios")]
#[unsafe(no_mangle)]
pub extern "C" fn freequeue_init_logger() {
    use log::LevelFilter;
    use oslog::OsLogger;

    OsLogger::new(LOG_SUBSYSTEM)
        .level_filter(LevelFilter::Debug)
        .init()
        .ok();
}

// ═══════════════════════════════════════════════════════════════════════════
// Opaque Handle Type
// ═══════════════════════════════════════════════════════════════════════════

/// Field layout a foreign caller can read through `fq_get_pointer`.
#[repr(C)]
pub struct QueueHeader {
    pub buffer_length: usize,
    pub channel_count: usize,
    /// Points at the cursor pair: `state[0]` read, `state[1]` write.
    pub state: *const Cursors,
    /// Points at `channel_count` channel base addresses.
    pub channel_data: *const *mut f32,
}

/// Opaque handle to a queue created across the boundary.
pub struct FreeQueueHandle {
    header: QueueHeader,
    // Backing store for `header.channel_data`.
    _channel_table: Box<[*mut f32]>,
    queue: Box<FreeQueue<f32>>,
}

impl FreeQueueHandle {
    fn new(queue: FreeQueue<f32>) -> Box<Self> {
        let queue = Box::new(queue);
        let channel_table: Box<[*mut f32]> = (0..queue.channel_count())
            .filter_map(|ch| queue.channel_ptr(ch))
            .collect();

        // Both boxes keep their heap addresses when moved into the handle.
        let header = QueueHeader {
            buffer_length: queue.buffer_length(),
            channel_count: queue.channel_count(),
            state: queue.cursors_ptr(),
            channel_data: channel_table.as_ptr(),
        };

        Box::new(Self {
            header,
            _channel_table: channel_table,
            queue,
        })
    }

    fn addresses(&self) -> QueueAddresses {
        let mut addresses = QueueAddresses::default();
        addresses.push("buffer_length", &self.header.buffer_length as *const _ as usize);
        addresses.push("channel_count", &self.header.channel_count as *const _ as usize);
        addresses.push("state", &self.header.state as *const _ as usize);
        addresses.push("channel_data", &self.header.channel_data as *const _ as usize);
        addresses
            .entries
            .extend(QueueAddresses::capture(&*self.queue).entries);
        addresses
    }
}

/// Names accepted by `fq_get_pointer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueField {
    BufferLength,
    ChannelCount,
    State,
    ChannelData,
}

impl FromStr for QueueField {
    type Err = FreeQueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buffer_length" => Ok(Self::BufferLength),
            "channel_count" => Ok(Self::ChannelCount),
            "state" => Ok(Self::State),
            "channel_data" => Ok(Self::ChannelData),
            other => Err(FreeQueueError::UnknownField(other.to_string())),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Channel Pointer Tables
// ═══════════════════════════════════════════════════════════════════════════

/// Caller-supplied input table viewed as channels of `block` samples.
struct RawInputs<'a> {
    table: &'a [*const f32],
    block: usize,
}

impl ChannelSource<f32> for RawInputs<'_> {
    fn channel_count(&self) -> usize {
        self.table.len()
    }

    fn channel(&self, index: usize) -> &[f32] {
        // SAFETY: entries were null-checked; the caller guarantees `block` samples.
        unsafe { slice::from_raw_parts(self.table[index], self.block) }
    }
}

/// Caller-supplied output table viewed as channels of `block` samples.
struct RawOutputs<'a> {
    table: &'a [*mut f32],
    block: usize,
}

impl ChannelSink<f32> for RawOutputs<'_> {
    fn channel_count(&self) -> usize {
        self.table.len()
    }

    fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        // SAFETY: entries were null-checked; the caller guarantees `block` samples.
        unsafe { slice::from_raw_parts_mut(self.table[index], self.block) }
    }
}

/// Borrow a pointer table of `len` entries, rejecting null tables and entries.
unsafe fn channel_table<'a, P: Copy>(table: *const P, len: usize, is_null: fn(P) -> bool) -> Option<&'a [P]> {
    if table.is_null() && len > 0 {
        warn!("channel pointer table is null");
        return None;
    }
    if len == 0 {
        return Some(&[]);
    }
    let entries = unsafe { slice::from_raw_parts(table, len) };
    if entries.iter().any(|&p| is_null(p)) {
        warn!("channel pointer table holds a null entry");
        return None;
    }
    Some(entries)
}

unsafe fn handle_ref<'a>(queue: *const FreeQueueHandle) -> Option<&'a FreeQueueHandle> {
    unsafe { queue.as_ref() }
}

// ═══════════════════════════════════════════════════════════════════════════
// Creation / Destruction
// ═══════════════════════════════════════════════════════════════════════════

/// Get the default configuration values.
#[unsafe(no_mangle)]
pub extern "C" fn fq_default_config() -> FreeQueueConfig {
    FreeQueueConfig::default()
}

/// Create a queue of `length` frames on each of `channel_count` channels.
///
/// Returns an opaque pointer that must be freed with `fq_destroy`, or NULL if
/// `length` frames cannot be addressed on this target.
#[unsafe(no_mangle)]
pub extern "C" fn fq_create(length: u32, channel_count: u32) -> *mut FreeQueueHandle {
    let config = FreeQueueConfig::new(length, channel_count);
    let queue = match FreeQueue::try_with_config(&config) {
        Ok(queue) => queue,
        Err(e) => {
            warn!("fq_create: {e}");
            return ptr::null_mut();
        }
    };
    let handle = FreeQueueHandle::new(queue);
    debug!(
        "created queue: {} frames x {} channels",
        config.capacity, config.channel_count
    );
    Box::into_raw(handle)
}

/// Create a queue from a configuration struct. NULL selects the defaults.
/// Returns NULL under the same conditions as `fq_create`.
///
/// # Safety
/// `config` must be NULL or point to a valid `FreeQueueConfig`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_create_with_config(config: *const FreeQueueConfig) -> *mut FreeQueueHandle {
    let cfg = if config.is_null() {
        FreeQueueConfig::default()
    } else {
        unsafe { ptr::read(config) }
    };
    fq_create(cfg.capacity, cfg.channel_count)
}

/// Destroy a queue, releasing channel storage and cursors.
///
/// # Safety
/// `queue` must be NULL or a pointer returned by `fq_create*` that has not
/// been destroyed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_destroy(queue: *mut FreeQueueHandle) {
    if !queue.is_null() {
        unsafe { drop(Box::from_raw(queue)) };
        debug!("destroyed queue");
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Data Operations
// ═══════════════════════════════════════════════════════════════════════════

/// Push `block_length` frames from each channel of `input`.
///
/// Returns `false` without writing anything if there is not enough room.
///
/// # Safety
/// Producer side only. `input` must point to `channel_count` channel pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_push(
    queue: *mut FreeQueueHandle,
    input: *const *const f32,
    block_length: usize,
) -> bool {
    let Some(handle) = (unsafe { handle_ref(queue) }) else {
        return false;
    };
    let Some(table) = (unsafe { channel_table(input, handle.header.channel_count, <*const f32>::is_null) }) else {
        return false;
    };
    let inputs = RawInputs {
        table,
        block: block_length,
    };
    unsafe { handle.queue.push_shared(&inputs, block_length) }.is_ok()
}

/// Push `block_length` frames, dropping the oldest unread frames if needed.
///
/// # Safety
/// Must not run concurrently with any producer or consumer call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_push_overwrite(
    queue: *mut FreeQueueHandle,
    input: *const *const f32,
    block_length: usize,
) -> bool {
    let Some(handle) = (unsafe { handle_ref(queue) }) else {
        return false;
    };
    let Some(table) = (unsafe { channel_table(input, handle.header.channel_count, <*const f32>::is_null) }) else {
        return false;
    };
    let inputs = RawInputs {
        table,
        block: block_length,
    };
    unsafe { handle.queue.push_overwrite_shared(&inputs, block_length) }.is_ok()
}

/// Pull `block_length` frames into each channel of `output`.
///
/// Returns `block_length`, or 0 without touching `output` if not enough
/// frames are ready. With `consume == false` the data stays queued.
///
/// # Safety
/// Consumer side only. `output` must point to `channel_count` channel pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_pull(
    queue: *mut FreeQueueHandle,
    output: *const *mut f32,
    block_length: usize,
    consume: bool,
) -> usize {
    let Some(handle) = (unsafe { handle_ref(queue) }) else {
        return 0;
    };
    let Some(table) = (unsafe { channel_table(output, handle.header.channel_count, <*mut f32>::is_null) }) else {
        return 0;
    };
    let mut outputs = RawOutputs {
        table,
        block: block_length,
    };
    unsafe { handle.queue.pull_shared(&mut outputs, block_length, consume) }.unwrap_or(0)
}

/// Pull up to `block_length` frames, oldest first. Returns the frame count.
///
/// # Safety
/// Consumer side only. `output` must point to `channel_count` channel pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_pull_up_to(
    queue: *mut FreeQueueHandle,
    output: *const *mut f32,
    block_length: usize,
    consume: bool,
) -> usize {
    let Some(handle) = (unsafe { handle_ref(queue) }) else {
        return 0;
    };
    let Some(table) = (unsafe { channel_table(output, handle.header.channel_count, <*mut f32>::is_null) }) else {
        return 0;
    };
    let mut outputs = RawOutputs {
        table,
        block: block_length,
    };
    unsafe { handle.queue.pull_up_to_shared(&mut outputs, block_length, consume) }.unwrap_or(0)
}

/// Pull the newest frames, up to `block_length`. Returns the frame count.
///
/// # Safety
/// Consumer side only. `output` must point to `channel_count` channel pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_pull_latest(
    queue: *mut FreeQueueHandle,
    output: *const *mut f32,
    block_length: usize,
    consume: bool,
) -> usize {
    let Some(handle) = (unsafe { handle_ref(queue) }) else {
        return 0;
    };
    let Some(table) = (unsafe { channel_table(output, handle.header.channel_count, <*mut f32>::is_null) }) else {
        return 0;
    };
    let mut outputs = RawOutputs {
        table,
        block: block_length,
    };
    unsafe { handle.queue.pull_latest_shared(&mut outputs, block_length, consume) }.unwrap_or(0)
}

// ═══════════════════════════════════════════════════════════════════════════
// Counters
// ═══════════════════════════════════════════════════════════════════════════

/// Reset both cursors and zero-fill the channels.
///
/// # Safety
/// Must not run concurrently with any other call on this queue.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_clear(queue: *mut FreeQueueHandle) -> bool {
    let Some(handle) = (unsafe { handle_ref(queue) }) else {
        return false;
    };
    unsafe { handle.queue.clear_shared() };
    true
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_get_read_counter(queue: *const FreeQueueHandle) -> usize {
    unsafe { handle_ref(queue) }.map_or(0, |h| h.queue.read_counter())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_get_write_counter(queue: *const FreeQueueHandle) -> usize {
    unsafe { handle_ref(queue) }.map_or(0, |h| h.queue.write_counter())
}

/// Overwrite the read cursor (reduced modulo the buffer length).
///
/// # Safety
/// Must not run concurrently with a consumer call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_set_read_counter(queue: *mut FreeQueueHandle, counter: usize) {
    if let Some(handle) = unsafe { handle_ref(queue) } {
        unsafe { handle.queue.set_read_counter_shared(counter) };
    }
}

/// Overwrite the write cursor (reduced modulo the buffer length).
///
/// # Safety
/// Must not run concurrently with a producer call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_set_write_counter(queue: *mut FreeQueueHandle, counter: usize) {
    if let Some(handle) = unsafe { handle_ref(queue) } {
        unsafe { handle.queue.set_write_counter_shared(counter) };
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_reset_read_counter(queue: *mut FreeQueueHandle) {
    unsafe { fq_set_read_counter(queue, 0) };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_reset_write_counter(queue: *mut FreeQueueHandle) {
    unsafe { fq_set_write_counter(queue, 0) };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_available_read(queue: *const FreeQueueHandle) -> usize {
    unsafe { handle_ref(queue) }.map_or(0, |h| h.queue.available_read())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_available_write(queue: *const FreeQueueHandle) -> usize {
    unsafe { handle_ref(queue) }.map_or(0, |h| h.queue.available_write())
}

// ═══════════════════════════════════════════════════════════════════════════
// Layout / Diagnostics
// ═══════════════════════════════════════════════════════════════════════════

/// Address of a named header field: `"buffer_length"`, `"channel_count"`,
/// `"state"` or `"channel_data"`. Returns NULL for anything else.
///
/// # Safety
/// `name` must be NULL or a valid null-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_get_pointer(queue: *mut FreeQueueHandle, name: *const c_char) -> *mut c_void {
    let Some(handle) = (unsafe { handle_ref(queue) }) else {
        return ptr::null_mut();
    };
    if name.is_null() {
        return ptr::null_mut();
    }

    let field = match unsafe { CStr::from_ptr(name) }
        .to_str()
        .map_err(|_| FreeQueueError::UnknownField("<non-utf8>".to_string()))
        .and_then(QueueField::from_str)
    {
        Ok(field) => field,
        Err(e) => {
            warn!("fq_get_pointer: {e}");
            return ptr::null_mut();
        }
    };

    let header = &handle.header;
    let address: *const c_void = match field {
        QueueField::BufferLength => (&header.buffer_length as *const usize).cast(),
        QueueField::ChannelCount => (&header.channel_count as *const usize).cast(),
        QueueField::State => (&header.state as *const *const Cursors).cast(),
        QueueField::ChannelData => (&header.channel_data as *const *const *mut f32).cast(),
    };
    address.cast_mut()
}

/// Log channel contents and cursor state.
///
/// # Safety
/// Reads every channel's storage, so it must not run concurrently with a
/// producer call (`fq_push`, `fq_push_overwrite`) or any exclusive call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_print_info(queue: *const FreeQueueHandle) {
    if let Some(handle) = unsafe { handle_ref(queue) } {
        diagnostics::log_info(&*handle.queue);
    }
}

/// Log the addresses of the header fields, cursors and channel storage.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fq_print_addresses(queue: *const FreeQueueHandle) {
    if let Some(handle) = unsafe { handle_ref(queue) } {
        diagnostics::log_address_table(&handle.addresses());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn field(queue: *mut FreeQueueHandle, name: &CStr) -> *mut c_void {
        unsafe { fq_get_pointer(queue, name.as_ptr()) }
    }

    #[test]
    fn test_null_handle_is_rejected() {
        let null = ptr::null_mut();
        let source = [1.0f32];
        let input = [source.as_ptr()];
        let mut sample = [0.0f32];
        let output = [sample.as_mut_ptr()];
        unsafe {
            assert!(!fq_push(null, input.as_ptr(), 1));
            assert!(!fq_push_overwrite(null, input.as_ptr(), 1));
            assert_eq!(fq_pull(null, output.as_ptr(), 1, true), 0);
            assert_eq!(fq_pull_up_to(null, output.as_ptr(), 1, true), 0);
            assert_eq!(fq_pull_latest(null, output.as_ptr(), 1, true), 0);
            assert!(!fq_clear(null));
            assert_eq!(fq_get_read_counter(null), 0);
            assert_eq!(fq_get_write_counter(null), 0);
            assert_eq!(fq_available_read(null), 0);
            assert_eq!(fq_available_write(null), 0);
            fq_set_read_counter(null, 3);
            fq_set_write_counter(null, 3);
            fq_reset_read_counter(null);
            fq_reset_write_counter(null);
            assert!(fq_get_pointer(null, c"state".as_ptr()).is_null());
            fq_print_info(null);
            fq_print_addresses(null);
            fq_destroy(null);
        }
    }

    #[test]
    fn test_push_pull_through_pointer_tables() {
        let queue = fq_create(3, 2);
        let left = [1.0f32, 2.0];
        let right = [10.0f32, 20.0];
        let input = [left.as_ptr(), right.as_ptr()];

        unsafe {
            assert!(fq_push(queue, input.as_ptr(), 2));
            assert_eq!(fq_get_write_counter(queue), 2);
            assert!(!fq_push(queue, input.as_ptr(), 2));

            let mut out_l = [0.0f32; 2];
            let mut out_r = [0.0f32; 2];
            let output = [out_l.as_mut_ptr(), out_r.as_mut_ptr()];

            assert_eq!(fq_pull(queue, output.as_ptr(), 2, false), 2);
            assert_eq!(fq_get_read_counter(queue), 0);
            assert_eq!(fq_pull(queue, output.as_ptr(), 2, true), 2);
            assert_eq!(fq_get_read_counter(queue), 2);
            assert_eq!(fq_pull(queue, output.as_ptr(), 1, true), 0);

            fq_destroy(queue);
            assert_eq!(out_l, left);
            assert_eq!(out_r, right);
        }
    }

    #[test]
    fn test_null_channel_entry_fails_without_mutation() {
        let queue = fq_create(4, 2);
        let left = [1.0f32];
        let input = [left.as_ptr(), ptr::null()];
        unsafe {
            assert!(!fq_push(queue, input.as_ptr(), 1));
            assert!(!fq_push(queue, ptr::null(), 1));
            assert_eq!(fq_get_write_counter(queue), 0);
            fq_destroy(queue);
        }
    }

    #[test]
    fn test_variants_and_counters() {
        let queue = fq_create(4, 1);
        let data = [1.0f32, 2.0, 3.0];
        let input = [data.as_ptr()];
        unsafe {
            assert!(fq_push(queue, input.as_ptr(), 3));
            assert!(fq_push_overwrite(queue, input.as_ptr(), 3));
            assert_eq!(fq_available_read(queue), 4);
            assert_eq!(fq_available_write(queue), 0);

            let mut out = [0.0f32; 4];
            let output = [out.as_mut_ptr()];
            assert_eq!(fq_pull_latest(queue, output.as_ptr(), 2, false), 2);
            assert_eq!(&out[..2], &[2.0, 3.0]);
            assert_eq!(fq_pull_up_to(queue, output.as_ptr(), 4, true), 4);
            assert_eq!(out, [3.0, 1.0, 2.0, 3.0]);

            fq_set_write_counter(queue, 12);
            assert_eq!(fq_get_write_counter(queue), 2);
            fq_reset_write_counter(queue);
            fq_reset_read_counter(queue);
            assert!(fq_clear(queue));
            assert_eq!(fq_available_read(queue), 0);
            fq_destroy(queue);
        }
    }

    #[test]
    fn test_get_pointer_exposes_layout() {
        let queue = fq_create(7, 2);
        let left = [5.0f32, 6.0];
        let right = [7.0f32, 8.0];
        let input = [left.as_ptr(), right.as_ptr()];

        unsafe {
            assert!(fq_push(queue, input.as_ptr(), 2));

            let length = field(queue, c"buffer_length") as *const usize;
            let channels = field(queue, c"channel_count") as *const usize;
            assert_eq!(*length, 8);
            assert_eq!(*channels, 2);

            let state = *(field(queue, c"state") as *const *const AtomicUsize);
            assert_eq!((*state).load(Ordering::Acquire), 0);
            assert_eq!((*state.add(1)).load(Ordering::Acquire), 2);

            let table = *(field(queue, c"channel_data") as *const *const *mut f32);
            let right_storage = *table.add(1);
            assert_eq!(*right_storage, 7.0);
            assert_eq!(*right_storage.add(1), 8.0);

            assert!(field(queue, c"capacity").is_null());
            assert!(fq_get_pointer(queue, ptr::null()).is_null());
            fq_destroy(queue);
        }
    }

    #[test]
    fn test_create_with_config() {
        let cfg = FreeQueueConfig::new(16, 1);
        unsafe {
            let queue = fq_create_with_config(&cfg);
            assert_eq!(fq_available_write(queue), 16);
            fq_destroy(queue);

            let queue = fq_create_with_config(ptr::null());
            assert_eq!(fq_available_write(queue), fq_default_config().capacity as usize);
            fq_destroy(queue);
        }
    }

    #[test]
    fn test_create_rejects_unaddressable_length() {
        // u32::MAX + 1 slots only overflows where usize is 32 bits.
        if usize::BITS == 32 {
            assert!(fq_create(u32::MAX, 1).is_null());
        }
        let queue = fq_create(0, 1);
        assert!(!queue.is_null());
        unsafe {
            assert_eq!(fq_available_write(queue), 0);
            fq_destroy(queue);
        }
    }

    #[test]
    fn test_field_names() {
        assert_eq!("state".parse::<QueueField>(), Ok(QueueField::State));
        assert_eq!(
            "channel_data".parse::<QueueField>(),
            Ok(QueueField::ChannelData)
        );
        assert_eq!(
            "bogus".parse::<QueueField>(),
            Err(FreeQueueError::UnknownField("bogus".to_string()))
        );
    }

    #[test]
    fn test_addresses_include_header() {
        let queue = fq_create(2, 1);
        unsafe {
            let handle = &*queue;
            let addresses = handle.addresses();
            assert_eq!(
                addresses.get("state"),
                Some(field(queue, c"state") as usize)
            );
            assert!(addresses.get("channel_data[0]").is_some());
            fq_print_addresses(queue);
            fq_print_info(queue);
            fq_destroy(queue);
        }
    }
}
