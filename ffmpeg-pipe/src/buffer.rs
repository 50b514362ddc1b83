use std::num::NonZeroUsize;

/// Default logical capacity of the working buffer.
pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(4096).unwrap();

/// Fixed-size scratch region the parser reads from.
///
/// Holds `capacity` bytes of live data followed by `padding` bytes that are
/// always zero, so a parser may look ahead past the logical end of a chunk
/// without touching uninitialized memory.
pub struct WorkingBuffer {
    data: Vec<u8>,
    capacity: usize,
    padding: usize,
}

impl WorkingBuffer {
    /// Allocates the buffer, returning `None` if the allocation fails.
    pub fn new(capacity: NonZeroUsize, padding: usize) -> Option<Self> {
        let capacity = capacity.get();
        let total = capacity.checked_add(padding)?;
        let mut data = Vec::new();
        data.try_reserve_exact(total).ok()?;
        data.resize(total, 0);
        Some(Self {
            data,
            capacity,
            padding,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Copies `chunk` to the front of the buffer and returns the filled region.
    ///
    /// The bytes between the region's end and the padding are left as they
    /// were; only the padding itself is guaranteed zero.
    pub fn load(&mut self, chunk: &[u8]) -> &[u8] {
        assert!(
            chunk.len() <= self.capacity,
            "chunk of {} bytes exceeds buffer capacity {}",
            chunk.len(),
            self.capacity
        );
        self.data[..chunk.len()].copy_from_slice(chunk);
        &self.data[..chunk.len()]
    }

    /// Splits `input` into the successive chunks [`load`](Self::load) accepts.
    pub fn chunks<'a>(&self, input: &'a [u8]) -> std::slice::Chunks<'a, u8> {
        input.chunks(self.capacity)
    }

    /// The zeroed tail past the logical capacity.
    pub fn padding_bytes(&self) -> &[u8] {
        &self.data[self.capacity..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CAPACITY.get(), 4096);
    }

    #[test]
    fn test_padding_is_zeroed() {
        let buffer = WorkingBuffer::new(capacity(8), 16).unwrap();
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.padding(), 16);
        assert_eq!(buffer.padding_bytes(), &[0u8; 16][..]);
    }

    #[test]
    fn test_load_returns_filled_region() {
        let mut buffer = WorkingBuffer::new(capacity(8), 4).unwrap();
        assert_eq!(buffer.load(&[1, 2, 3]), &[1, 2, 3][..]);
        assert_eq!(buffer.load(&[9; 8]), &[9; 8][..]);
        // a shorter refill only exposes its own bytes
        assert_eq!(buffer.load(&[7]), &[7][..]);
        assert_eq!(buffer.padding_bytes(), &[0u8; 4][..]);
    }

    #[test]
    fn test_chunks_are_bounded_by_capacity() {
        let buffer = WorkingBuffer::new(capacity(4), 0).unwrap();
        let input: Vec<u8> = (0..10).collect();
        let lens: Vec<usize> = buffer.chunks(&input).map(|c| c.len()).collect();
        assert_eq!(lens, vec![4, 4, 2]);
        assert_eq!(buffer.chunks(&[]).count(), 0);
    }

    #[test]
    #[should_panic]
    fn test_oversized_chunk_panics() {
        let mut buffer = WorkingBuffer::new(capacity(2), 0).unwrap();
        buffer.load(&[0, 1, 2]);
    }
}
