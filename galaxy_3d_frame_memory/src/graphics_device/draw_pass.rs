/// DrawPass trait - the part of a render pass that frame memory records into

use std::any::Any;
use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Buffer, IndexType};

/// Render pass being recorded by the caller
///
/// The caller owns pass setup (attachments, pipeline, bindings); upload
/// sessions only bind their vertex/index slices and issue indexed draws.
pub trait DrawPass {
    /// Bind a vertex buffer at binding 0
    ///
    /// # Arguments
    ///
    /// * `buffer` - Buffer to bind
    /// * `offset` - Offset into the buffer in bytes
    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    /// Bind an index buffer
    ///
    /// # Arguments
    ///
    /// * `buffer` - Buffer to bind
    /// * `offset` - Offset into the buffer in bytes
    /// * `index_type` - Type of indices (U16 or U32)
    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()>;

    /// Draw indexed vertices
    ///
    /// # Arguments
    ///
    /// * `index_count` - Number of indices to draw
    /// * `first_index` - Index of first index
    /// * `base_vertex` - Value added to each index before fetching the vertex
    /// * `instance_count` - Number of instances
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, base_vertex: i32, instance_count: u32) -> Result<()>;

    /// Downcast support for backends (used by `GraphicsDevice::submit`)
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
