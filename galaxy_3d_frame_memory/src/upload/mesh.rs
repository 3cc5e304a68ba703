/// Mesh - CPU-side geometry of one draw, staged by an UploadSession
///
/// Holds interleaved vertex bytes, optional indices and the primitive mode.
/// The vertex layout is not stored here: the session receives it with the
/// mesh, the way a pipeline dictates the layout of what it draws.

use bytemuck::Pod;
use crate::graphics_device::{IndexType, PrimitiveMode};

/// Index data of a mesh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshIndices {
    /// 16-bit indices
    U16(Vec<u16>),
    /// 32-bit indices
    U32(Vec<u32>),
}

impl MeshIndices {
    /// Type of the stored indices
    pub fn index_type(&self) -> IndexType {
        match self {
            MeshIndices::U16(_) => IndexType::U16,
            MeshIndices::U32(_) => IndexType::U32,
        }
    }

    /// Number of indices
    pub fn len(&self) -> usize {
        match self {
            MeshIndices::U16(indices) => indices.len(),
            MeshIndices::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw index bytes, ready for upload
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MeshIndices::U16(indices) => bytemuck::cast_slice(indices),
            MeshIndices::U32(indices) => bytemuck::cast_slice(indices),
        }
    }
}

impl From<Vec<u16>> for MeshIndices {
    fn from(indices: Vec<u16>) -> Self {
        MeshIndices::U16(indices)
    }
}

impl From<Vec<u32>> for MeshIndices {
    fn from(indices: Vec<u32>) -> Self {
        MeshIndices::U32(indices)
    }
}

/// Geometry of one draw
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<u8>,
    indices: Option<MeshIndices>,
    mode: PrimitiveMode,
}

impl Mesh {
    /// Mesh from raw interleaved vertex bytes, without indices
    pub fn new(vertices: Vec<u8>, mode: PrimitiveMode) -> Self {
        Self {
            vertices,
            indices: None,
            mode,
        }
    }

    /// Mesh from a slice of vertex structs
    ///
    /// # Example
    ///
    /// ```
    /// use galaxy_3d_frame_memory::galaxy3d::{Mesh, PrimitiveMode};
    ///
    /// let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    /// let mesh = Mesh::from_vertices(&positions, PrimitiveMode::Triangles);
    /// assert_eq!(mesh.vertex_bytes().len(), 36);
    /// ```
    pub fn from_vertices<T: Pod>(vertices: &[T], mode: PrimitiveMode) -> Self {
        Self::new(bytemuck::cast_slice(vertices).to_vec(), mode)
    }

    /// Attach indices (`Vec<u16>` or `Vec<u32>`)
    pub fn with_indices(mut self, indices: impl Into<MeshIndices>) -> Self {
        self.indices = Some(indices.into());
        self
    }

    /// Interleaved vertex bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        &self.vertices
    }

    /// Indices, `None` for a sequentially drawn mesh
    pub fn indices(&self) -> Option<&MeshIndices> {
        self.indices.as_ref()
    }

    /// Primitive mode
    pub fn mode(&self) -> PrimitiveMode {
        self.mode
    }

    /// Number of whole vertices for a layout of `stride` bytes
    pub fn vertex_count(&self, stride: u32) -> u64 {
        match stride {
            0 => 0,
            stride => self.vertices.len() as u64 / u64::from(stride),
        }
    }

    /// Whether the mesh has no vertices
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}
