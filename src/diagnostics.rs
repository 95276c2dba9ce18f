//! Human-readable dumps of a queue's contents and memory layout.
//!
//! Purely observational: nothing here mutates the queue. Output goes through
//! the `log` facade at `info` level.

use std::fmt;

use crate::free_queue::{FreeQueue, available_read, available_write};
use crate::sample::Sample;

/// At most this many samples per channel are included in a dump.
pub const MAX_DUMP_SAMPLES: usize = 100;

/// Snapshot of a queue's storage and cursor state.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueInfo<T> {
    pub buffer_length: usize,
    pub read: usize,
    pub write: usize,
    pub available_read: usize,
    pub available_write: usize,
    /// Leading samples of each channel, in physical order.
    pub channels: Vec<Vec<T>>,
}

impl<T: Sample> QueueInfo<T> {
    pub fn capture(queue: &FreeQueue<T>) -> Self {
        let read = queue.read_counter();
        let write = queue.write_counter();
        let channels = (0..queue.channel_count())
            .filter_map(|ch| queue.channel_snapshot(ch))
            .map(|mut samples| {
                samples.truncate(MAX_DUMP_SAMPLES);
                samples
            })
            .collect();

        Self {
            buffer_length: queue.buffer_length(),
            read,
            write,
            available_read: available_read(read, write, queue.buffer_length()),
            available_write: available_write(read, write, queue.buffer_length()),
            channels,
        }
    }
}

impl<T: Sample> fmt::Display for QueueInfo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ch, samples) in self.channels.iter().enumerate() {
            write!(f, "channel {ch}:")?;
            for sample in samples {
                write!(f, " {sample:.6}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "----------")?;
        writeln!(f, "current_read: {}  | current_write: {}", self.read, self.write)?;
        writeln!(
            f,
            "available_read: {}  | available_write: {}",
            self.available_read, self.available_write
        )?;
        write!(f, "----------")
    }
}

/// Named addresses of a queue's fields and storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueAddresses {
    pub entries: Vec<(String, usize)>,
}

impl QueueAddresses {
    pub fn capture<T: Sample>(queue: &FreeQueue<T>) -> Self {
        let mut addresses = Self::default();
        let state = queue.cursors_ptr() as usize;
        addresses.push("state[0]", state);
        addresses.push("state[1]", state + std::mem::size_of::<usize>());
        for ch in 0..queue.channel_count() {
            if let Some(base) = queue.channel_ptr(ch) {
                addresses.push(format!("channel_data[{ch}]"), base as usize);
            }
        }
        addresses
    }

    pub fn push(&mut self, name: impl Into<String>, address: usize) {
        self.entries.push((name.into(), address));
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, address)| *address)
    }
}

impl fmt::Display for QueueAddresses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, address)) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{name:<16}: {address:#x}   uint: {address}")?;
        }
        Ok(())
    }
}

/// Log channel contents and cursor state.
pub fn log_info<T: Sample>(queue: &FreeQueue<T>) {
    for line in QueueInfo::capture(queue).to_string().lines() {
        log::info!("{line}");
    }
}

/// Log the addresses of the cursors and channel storage.
pub fn log_addresses<T: Sample>(queue: &FreeQueue<T>) {
    log_address_table(&QueueAddresses::capture(queue));
}

pub(crate) fn log_address_table(addresses: &QueueAddresses) {
    for line in addresses.to_string().lines() {
        log::info!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_reports_cursors() {
        let mut queue = FreeQueue::<f32>::new(4, 1);
        assert!(queue.push(&[[1.0, 2.0, 3.0]], 3));
        let mut out = [[0.0f32; 1]];
        assert_eq!(queue.pull(&mut out, 1, true), 1);

        let info = QueueInfo::capture(&queue);
        assert_eq!(info.read, 1);
        assert_eq!(info.write, 3);
        assert_eq!(info.available_read, 2);
        assert_eq!(info.available_write, 2);
        assert_eq!(info.channels, vec![vec![1.0, 2.0, 3.0, 0.0, 0.0]]);

        let text = info.to_string();
        assert!(text.starts_with("channel 0: 1.000000 2.000000 3.000000"));
        assert!(text.contains("current_read: 1  | current_write: 3"));
        assert!(text.contains("available_read: 2  | available_write: 2"));
    }

    #[test]
    fn test_info_truncates_long_channels() {
        let queue = FreeQueue::<f64>::new(500, 2);
        let info = QueueInfo::capture(&queue);
        assert_eq!(info.channels.len(), 2);
        assert!(info.channels.iter().all(|ch| ch.len() == MAX_DUMP_SAMPLES));
    }

    #[test]
    fn test_addresses_point_at_storage() {
        let queue = FreeQueue::<f32>::new(4, 2);
        let addresses = QueueAddresses::capture(&queue);
        assert_eq!(addresses.get("state[0]"), Some(queue.cursors_ptr() as usize));
        assert_eq!(
            addresses.get("channel_data[1]"),
            queue.channel_ptr(1).map(|p| p as usize)
        );
        assert!(addresses.to_string().contains("state[1]"));
    }

    #[test]
    fn test_log_helpers_do_not_mutate() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut queue = FreeQueue::<f32>::new(2, 1);
        assert!(queue.push(&[[0.25]], 1));
        log_info(&queue);
        log_addresses(&queue);
        assert_eq!(queue.available_read(), 1);
    }
}
