/// BufferSlice - byte range of a ring slot handed to a draw

use std::fmt;
use std::sync::Arc;
use crate::graphics_device::Buffer;

/// Byte range written by `RingBuffer::upload`
///
/// Valid until the owning slot becomes current again or the ring is cleared.
/// `RingBuffer::is_slice_live` tells whether that point has passed.
#[derive(Clone)]
pub struct BufferSlice {
    pub(crate) buffer: Arc<dyn Buffer>,
    pub(crate) offset: u64,
    pub(crate) length: u64,
    pub(crate) slot: usize,
    pub(crate) generation: u64,
}

impl BufferSlice {
    /// Buffer the bytes were written to
    pub fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    /// Offset of the first byte
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Length in bytes
    pub fn length(&self) -> u64 {
        self.length
    }

    /// One past the last byte
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Whether the slice covers no bytes
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Index of the slot the slice was written in
    pub fn slot_index(&self) -> usize {
        self.slot
    }

    /// Slot generation at write time
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for BufferSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferSlice")
            .field("buffer_size", &self.buffer.size())
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("slot", &self.slot)
            .field("generation", &self.generation)
            .finish()
    }
}
