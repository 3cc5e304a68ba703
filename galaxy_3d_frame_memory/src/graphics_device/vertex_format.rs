/// Vertex formats, index types and primitive modes

/// Attribute data format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    // Float formats
    R32_SFLOAT,         // float (4 bytes)
    R32G32_SFLOAT,      // vec2 (8 bytes)
    R32G32B32_SFLOAT,   // vec3 (12 bytes)
    R32G32B32A32_SFLOAT, // vec4 (16 bytes)

    // Integer formats
    R32_UINT,
    R16G16_UNORM,
    R16G16_SINT,

    // Byte formats
    R8G8B8A8_UNORM,     // packed color
    R8G8B8A8_SNORM,     // packed normal
}

impl BufferFormat {
    /// Returns size in bytes for this format
    pub fn size_bytes(&self) -> u32 {
        match self {
            BufferFormat::R32_SFLOAT | BufferFormat::R32_UINT => 4,
            BufferFormat::R32G32_SFLOAT => 8,
            BufferFormat::R32G32B32_SFLOAT => 12,
            BufferFormat::R32G32B32A32_SFLOAT => 16,
            BufferFormat::R16G16_UNORM | BufferFormat::R16G16_SINT => 4,
            BufferFormat::R8G8B8A8_UNORM | BufferFormat::R8G8B8A8_SNORM => 4,
        }
    }
}

/// Interleaved vertex layout of one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexFormat {
    attributes: Vec<BufferFormat>,
    stride: u32,
}

impl VertexFormat {
    /// Build a tightly packed layout from its attributes
    pub fn new(attributes: &[BufferFormat]) -> Self {
        let stride = attributes.iter().map(BufferFormat::size_bytes).sum();
        Self {
            attributes: attributes.to_vec(),
            stride,
        }
    }

    /// Attributes in declaration order
    pub fn attributes(&self) -> &[BufferFormat] {
        &self.attributes
    }

    /// Size of one vertex in bytes
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Position (vec3) + color (rgba8), the common debug geometry layout
    pub fn position_color() -> Self {
        Self::new(&[BufferFormat::R32G32B32_SFLOAT, BufferFormat::R8G8B8A8_UNORM])
    }

    /// Position (vec3) + uv (vec2) + color (rgba8)
    pub fn position_tex_color() -> Self {
        Self::new(&[
            BufferFormat::R32G32B32_SFLOAT,
            BufferFormat::R32G32_SFLOAT,
            BufferFormat::R8G8B8A8_UNORM,
        ])
    }
}

/// Type of indices in an index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 16-bit indices
    U16,
    /// 32-bit indices
    U32,
}

impl IndexType {
    /// Size of one index in bytes
    pub fn bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }

    /// Smallest index type able to address `vertex_count` vertices
    pub fn for_vertex_count(vertex_count: u32) -> Self {
        if vertex_count <= u32::from(u16::MAX) + 1 {
            IndexType::U16
        } else {
            IndexType::U32
        }
    }
}

/// How vertices are assembled into primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    /// Independent lines, 2 vertices each
    Lines,
    /// Independent triangles, 3 vertices each
    Triangles,
    /// Independent quads, 4 vertices each, drawn as 2 triangles
    Quads,
}

impl PrimitiveMode {
    /// Vertices per primitive
    pub fn primitive_length(&self) -> u32 {
        match self {
            PrimitiveMode::Lines => 2,
            PrimitiveMode::Triangles => 3,
            PrimitiveMode::Quads => 4,
        }
    }

    /// Number of indices needed to draw `vertex_count` vertices
    pub fn index_count(&self, vertex_count: u32) -> u32 {
        match self {
            PrimitiveMode::Lines | PrimitiveMode::Triangles => vertex_count,
            PrimitiveMode::Quads => vertex_count / 4 * 6,
        }
    }
}
