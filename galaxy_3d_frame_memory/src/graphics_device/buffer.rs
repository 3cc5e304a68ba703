/// Buffer trait and buffer descriptor

use std::any::Any;
use bitflags::bitflags;
use crate::error::Result;

bitflags! {
    /// Buffer usage flags
    ///
    /// Ring buffers always add `MAP_WRITE` to the usage they are created with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Vertex buffer
        const VERTEX = 1 << 0;
        /// Index buffer
        const INDEX = 1 << 1;
        /// Uniform/constant buffer
        const UNIFORM = 1 << 2;
        /// Storage buffer
        const STORAGE = 1 << 3;
        /// CPU-writable through `Buffer::write`
        const MAP_WRITE = 1 << 4;
        /// Destination of device copies
        const COPY_DST = 1 << 5;
    }
}

impl BufferUsage {
    /// Short name of the primary usage, for labels and logs
    pub fn kind_name(&self) -> &'static str {
        if self.contains(BufferUsage::VERTEX) {
            "vertex"
        } else if self.contains(BufferUsage::INDEX) {
            "index"
        } else if self.contains(BufferUsage::UNIFORM) {
            "uniform"
        } else if self.contains(BufferUsage::STORAGE) {
            "storage"
        } else {
            "generic"
        }
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Debug label (shows up in backend captures)
    pub label: String,
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types (e.g., VulkanBuffer).
/// The device memory is released when the last reference is dropped.
pub trait Buffer: Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    /// Usage flags the buffer was created with
    fn usage(&self) -> BufferUsage;

    /// Write bytes into CPU-visible memory
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Data to write; `offset + data.len()` must not exceed `size()`
    fn write(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
