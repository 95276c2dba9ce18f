// src/channels.rs
//
// Per-channel views over caller-owned block buffers.

/// Read access to one block of samples per channel.
///
/// Implemented for slices, arrays and vectors of anything that derefs to
/// `[T]`, so `&[&left[..], &right[..]]` and `&vec![vec![0.0; n]; 2]` both work.
pub trait ChannelSource<T> {
    fn channel_count(&self) -> usize;
    fn channel(&self, index: usize) -> &[T];
}

/// Write access to one block of samples per channel.
pub trait ChannelSink<T> {
    fn channel_count(&self) -> usize;
    fn channel_mut(&mut self, index: usize) -> &mut [T];
}

impl<T, S: AsRef<[T]>> ChannelSource<T> for [S] {
    #[inline]
    fn channel_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn channel(&self, index: usize) -> &[T] {
        self[index].as_ref()
    }
}

impl<T, S: AsRef<[T]>, const N: usize> ChannelSource<T> for [S; N] {
    #[inline]
    fn channel_count(&self) -> usize {
        N
    }

    #[inline]
    fn channel(&self, index: usize) -> &[T] {
        self[index].as_ref()
    }
}

impl<T, S: AsRef<[T]>> ChannelSource<T> for Vec<S> {
    #[inline]
    fn channel_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn channel(&self, index: usize) -> &[T] {
        self[index].as_ref()
    }
}

impl<T, S: AsMut<[T]>> ChannelSink<T> for [S] {
    #[inline]
    fn channel_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn channel_mut(&mut self, index: usize) -> &mut [T] {
        self[index].as_mut()
    }
}

impl<T, S: AsMut<[T]>, const N: usize> ChannelSink<T> for [S; N] {
    #[inline]
    fn channel_count(&self) -> usize {
        N
    }

    #[inline]
    fn channel_mut(&mut self, index: usize) -> &mut [T] {
        self[index].as_mut()
    }
}

impl<T, S: AsMut<[T]>> ChannelSink<T> for Vec<S> {
    #[inline]
    fn channel_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn channel_mut(&mut self, index: usize) -> &mut [T] {
        self[index].as_mut()
    }
}

/// Planar block: all frames of channel 0, then all frames of channel 1, ...
///
/// Layout: [C0_0..C0_N, C1_0..C1_N, ...]
#[derive(Debug)]
pub struct PlanarBlock<'a, T> {
    pub channels: usize,
    pub frames: usize,
    pub data: &'a [T],
}

impl<'a, T> PlanarBlock<'a, T> {
    /// Wrap `data` as `channels` runs of `frames` samples.
    ///
    /// Returns `None` if `data` is too short to hold every channel.
    #[inline]
    pub fn new(data: &'a [T], channels: usize, frames: usize) -> Option<Self> {
        if data.len() < channels.checked_mul(frames)? {
            return None;
        }
        Some(Self {
            channels,
            frames,
            data,
        })
    }
}

impl<T> ChannelSource<T> for PlanarBlock<'_, T> {
    #[inline]
    fn channel_count(&self) -> usize {
        self.channels
    }

    #[inline]
    fn channel(&self, index: usize) -> &[T] {
        let start = index * self.frames;
        &self.data[start..start + self.frames]
    }
}

/// Mutable counterpart of [`PlanarBlock`].
#[derive(Debug)]
pub struct PlanarBlockMut<'a, T> {
    pub channels: usize,
    pub frames: usize,
    pub data: &'a mut [T],
}

impl<'a, T> PlanarBlockMut<'a, T> {
    #[inline]
    pub fn new(data: &'a mut [T], channels: usize, frames: usize) -> Option<Self> {
        if data.len() < channels.checked_mul(frames)? {
            return None;
        }
        Some(Self {
            channels,
            frames,
            data,
        })
    }
}

impl<T> ChannelSink<T> for PlanarBlockMut<'_, T> {
    #[inline]
    fn channel_count(&self) -> usize {
        self.channels
    }

    #[inline]
    fn channel_mut(&mut self, index: usize) -> &mut [T] {
        let start = index * self.frames;
        &mut self.data[start..start + self.frames]
    }
}
