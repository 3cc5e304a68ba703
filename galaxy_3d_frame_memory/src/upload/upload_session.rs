/// UploadSession - stages the geometry of one draw through a vertex and an index ring
///
/// Per frame: `upload_and_set(mesh, format, rotate)` then `bind_and_draw(pass)`,
/// then `mark_submitted(fence)` once the pass has been submitted. Several
/// meshes may be staged in one cycle by passing `rotate = true` only for the
/// first of them.
///
/// Both slices are bound at offset 0 and addressed through `base_vertex` and
/// `first_index`, so vertex uploads are aligned to the vertex stride and index
/// uploads to the index size.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{BufferUsage, DrawPass, Fence, GraphicsDevice, IndexType, VertexFormat};
use crate::ring::{BufferSlice, RingBuffer, RingBufferConfig, RingBufferStats};
use crate::upload::{Mesh, SequentialIndexBuffer};
use crate::engine_trace;

/// Vertex and index ring of one draw stream plus the state of its last upload
pub struct UploadSession {
    label: String,
    vertex_ring: RingBuffer,
    index_ring: RingBuffer,
    sequential: SequentialIndexBuffer,

    // Per-draw state, set by upload_and_set
    vertex_slice: Option<BufferSlice>,
    index_slice: Option<BufferSlice>,
    index_count: u32,
    vertex_format: Option<VertexFormat>,
    index_type: Option<IndexType>,
    ready: bool,
}

impl UploadSession {
    /// Create a session with its two rings ("<label> VBO" and "<label> IBO")
    ///
    /// # Arguments
    ///
    /// * `device` - Device the ring buffers are created on
    /// * `label` - Debug label of the session
    /// * `vertex_config` - Configuration of the vertex ring
    /// * `index_config` - Configuration of the index ring
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        label: impl Into<String>,
        vertex_config: RingBufferConfig,
        index_config: RingBufferConfig,
    ) -> Result<Self> {
        let label = label.into();
        let vertex_ring = RingBuffer::new(
            Arc::clone(&device), format!("{} VBO", label), BufferUsage::VERTEX, vertex_config,
        )?;
        let index_ring = RingBuffer::new(device, format!("{} IBO", label), BufferUsage::INDEX, index_config)?;

        Ok(Self {
            label,
            vertex_ring,
            index_ring,
            sequential: SequentialIndexBuffer::new(),
            vertex_slice: None,
            index_slice: None,
            index_count: 0,
            vertex_format: None,
            index_type: None,
            ready: false,
        })
    }

    // ===== UPLOAD =====

    /// Upload `mesh` and remember what `bind_and_draw` needs
    ///
    /// Meshes without indices are drawn with generated sequential indices
    /// for their primitive mode. An empty mesh leaves the session not ready.
    ///
    /// # Arguments
    ///
    /// * `mesh` - Geometry to draw
    /// * `format` - Layout of the vertex bytes
    /// * `rotate` - Rotate both rings first (once per submission cycle)
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` when the vertex bytes are not a whole number
    /// of vertices, or an allocation error from either ring. The session is
    /// left not ready.
    pub fn upload_and_set(&mut self, mesh: &Mesh, format: &VertexFormat, rotate: bool) -> Result<()> {
        self.clear_states();

        let stride = format.stride();
        let vertex_bytes = mesh.vertex_bytes();
        if stride == 0 || vertex_bytes.len() as u64 % u64::from(stride) != 0 {
            return Err(Error::InvalidResource(format!(
                "'{}': {} vertex bytes are not a multiple of the {}-byte stride",
                self.label, vertex_bytes.len(), stride
            )));
        }
        let vertex_count = u32::try_from(mesh.vertex_count(stride)).map_err(|_| {
            Error::InvalidResource(format!("'{}': too many vertices for one draw", self.label))
        })?;

        if rotate {
            self.vertex_ring.rotate()?;
            self.index_ring.rotate()?;
        }
        if mesh.is_empty() {
            return Ok(());
        }

        let vertex_slice = self.vertex_ring.upload_aligned(vertex_bytes, u64::from(stride))?;

        let (index_slice, index_type, index_count) = match mesh.indices() {
            Some(indices) => {
                let index_type = indices.index_type();
                let index_count = u32::try_from(indices.len()).map_err(|_| {
                    Error::InvalidResource(format!("'{}': too many indices for one draw", self.label))
                })?;
                let slice = self.index_ring.upload_aligned(indices.as_bytes(), u64::from(index_type.bytes()))?;
                (slice, index_type, index_count)
            }
            None => {
                let index_type = IndexType::for_vertex_count(vertex_count);
                let index_count = mesh.mode().index_count(vertex_count);
                let bytes = self.sequential.indices(mesh.mode(), index_type, index_count)?;
                let slice = self.index_ring.upload_aligned(bytes, u64::from(index_type.bytes()))?;
                (slice, index_type, index_count)
            }
        };

        engine_trace!("galaxy3d::UploadSession", "'{}': {} vertices, {} {:?} indices",
            self.label, vertex_count, index_count, index_type);

        self.vertex_slice = Some(vertex_slice);
        self.index_slice = Some(index_slice);
        self.index_count = index_count;
        self.vertex_format = Some(format.clone());
        self.index_type = Some(index_type);
        self.ready = index_count > 0;
        Ok(())
    }

    // ===== DRAW =====

    /// Bind both slices and issue the indexed draw
    ///
    /// No-op when the session is not ready.
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` if the session is ready but a field is missing,
    /// or the error of the pass.
    pub fn bind_and_draw(&self, pass: &mut dyn DrawPass) -> Result<()> {
        if !self.ready {
            return Ok(());
        }
        let (Some(vertex_slice), Some(index_slice), Some(format), Some(index_type)) =
            (&self.vertex_slice, &self.index_slice, &self.vertex_format, self.index_type)
        else {
            return Err(Error::InvalidState(format!("'{}' is ready but its draw state is incomplete", self.label)));
        };
        debug_assert!(
            self.vertex_ring.is_slice_live(vertex_slice) && self.index_ring.is_slice_live(index_slice),
            "UploadSession '{}' drawn with a stale slice",
            self.label
        );

        let base_vertex = i32::try_from(vertex_slice.offset() / u64::from(format.stride())).map_err(|_| {
            Error::InvalidState(format!("'{}': base vertex out of range", self.label))
        })?;
        let first_index = u32::try_from(index_slice.offset() / u64::from(index_type.bytes())).map_err(|_| {
            Error::InvalidState(format!("'{}': first index out of range", self.label))
        })?;

        pass.bind_vertex_buffer(vertex_slice.buffer(), 0)?;
        pass.bind_index_buffer(index_slice.buffer(), 0, index_type)?;
        pass.draw_indexed(self.index_count, first_index, base_vertex, 1)
    }

    // ===== FRAME =====

    /// Rotate both rings without uploading
    pub fn rotate(&mut self) -> Result<()> {
        self.vertex_ring.rotate()?;
        self.index_ring.rotate()
    }

    /// Attach the fence of the submission that drew this cycle's uploads
    pub fn mark_submitted(&mut self, fence: &Arc<dyn Fence>) {
        self.vertex_ring.mark_submitted(fence);
        self.index_ring.mark_submitted(fence);
    }

    /// Release retired buffers of both rings; returns how many were released
    pub fn collect_retired(&mut self) -> usize {
        self.vertex_ring.collect_retired() + self.index_ring.collect_retired()
    }

    /// Whether neither ring can still be read by the device
    pub fn is_safe_for_close(&self) -> bool {
        self.vertex_ring.is_safe_for_close() && self.index_ring.is_safe_for_close()
    }

    /// Wait until both rings are safe to clear
    pub fn drain(&mut self) -> Result<()> {
        self.vertex_ring.drain()?;
        self.index_ring.drain()
    }

    // ===== RESET =====

    /// Forget the last upload; the rings are untouched
    pub fn clear_states(&mut self) {
        self.vertex_slice = None;
        self.index_slice = None;
        self.index_count = 0;
        self.vertex_format = None;
        self.index_type = None;
        self.ready = false;
    }

    /// Clear both rings (and the per-draw state, whose slices die with them)
    ///
    /// Same precondition as `RingBuffer::clear`.
    pub fn clear_buffers(&mut self) {
        self.clear_states();
        self.vertex_ring.clear();
        self.index_ring.clear();
    }

    // ===== ACCESSORS =====

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether `bind_and_draw` will draw
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn vertex_slice(&self) -> Option<&BufferSlice> {
        self.vertex_slice.as_ref()
    }

    pub fn index_slice(&self) -> Option<&BufferSlice> {
        self.index_slice.as_ref()
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertex_format(&self) -> Option<&VertexFormat> {
        self.vertex_format.as_ref()
    }

    pub fn index_type(&self) -> Option<IndexType> {
        self.index_type
    }

    pub fn vertex_ring(&self) -> &RingBuffer {
        &self.vertex_ring
    }

    pub fn index_ring(&self) -> &RingBuffer {
        &self.index_ring
    }

    /// Counters of both rings, merged
    pub fn stats(&self) -> RingBufferStats {
        let mut stats = self.vertex_ring.stats();
        stats.merge(&self.index_ring.stats());
        stats
    }
}

#[cfg(test)]
#[path = "upload_session_tests.rs"]
mod tests;
