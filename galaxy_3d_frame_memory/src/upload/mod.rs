/// Upload module - per-draw staging of mesh geometry through ring buffers

// Module declarations
pub mod mesh;
pub mod sequential_index;
pub mod upload_session;

// Re-export main types
pub use mesh::{Mesh, MeshIndices};
pub use sequential_index::{sequential_index, SequentialIndexBuffer};
pub use upload_session::UploadSession;
