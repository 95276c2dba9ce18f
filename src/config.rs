// src/config.rs

// Default queue configuration
pub const DEFAULT_CAPACITY: u32 = 1764;
pub const DEFAULT_CHANNEL_COUNT: u32 = 2;

/// Configuration for creating a queue.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeQueueConfig {
    /// Usable frames per channel (e.g., 128, 1764).
    pub capacity: u32,
    /// Number of parallel channels (e.g., 1 for mono, 2 for stereo).
    pub channel_count: u32,
}

impl FreeQueueConfig {
    pub fn new(capacity: u32, channel_count: u32) -> Self {
        Self {
            capacity,
            channel_count,
        }
    }
}

impl Default for FreeQueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            channel_count: DEFAULT_CHANNEL_COUNT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_stereo() {
        let cfg = FreeQueueConfig::default();
        assert_eq!(cfg.capacity, 1764);
        assert_eq!(cfg.channel_count, 2);
    }
}
