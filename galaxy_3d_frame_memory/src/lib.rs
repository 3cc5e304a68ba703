/*!
# Galaxy 3D Frame Memory

Transient GPU memory for the Galaxy3D frame loop.

This crate supplies the per-draw vertex and index byte ranges of a real-time
renderer without stalling the CPU on the GPU, and the reusable CPU-side
containers its render code builds every frame. Backend implementations
(Vulkan, headless) provide the device capabilities behind trait objects.

## Architecture

- **GraphicsDevice / Buffer / Fence / DrawPass**: capability traits of a backend
- **RingBuffer**: N-buffered, fence-gated, growable upload stream
- **UploadSession**: vertex + index ring pair that stages and draws one mesh
- **ObjectPool / ScratchPools**: free-list recyclers for CPU-side objects
- **FrameMemory**: owner of every session and scratch pool of a render thread

## Frame loop

```
use std::sync::Arc;
use galaxy_3d_frame_memory::galaxy3d::{
    Fence, FrameMemory, FrameMemoryConfig, HeadlessDevice, HeadlessDrawPass,
    Mesh, PrimitiveMode, VertexFormat,
};

let device = Arc::new(HeadlessDevice::default());
let mut memory = FrameMemory::new(device.clone(), FrameMemoryConfig::default())?;
let debug = memory.create_session("debug")?;

let positions: [[f32; 4]; 4] = [[0.0; 4], [1.0, 0.0, 0.0, 0.0], [1.0; 4], [0.0, 1.0, 0.0, 0.0]];
let quad = Mesh::from_vertices(&positions, PrimitiveMode::Quads);
let format = VertexFormat::position_color();

for _ in 0..3 {
    let mut pass = HeadlessDrawPass::new("frame");
    if let Some(session) = memory.session_mut(debug) {
        session.upload_and_set(&quad, &format, true)?;
        session.bind_and_draw(&mut pass)?;
    }
    let fence: Arc<dyn Fence> = device.submit_pass(&mut pass);
    memory.mark_submitted(&fence);
    memory.end_frame();
}

memory.shutdown()?;
assert!(memory.is_safe_for_close());
# Ok::<(), galaxy_3d_frame_memory::galaxy3d::Error>(())
```
*/

// Internal modules
mod error;
mod frame_memory;
pub mod log;
pub mod graphics_device;
pub mod pool;
pub mod ring;
pub mod upload;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Subsystem root
    pub use crate::frame_memory::{FrameMemory, FrameMemoryConfig, SessionKey};

    // Device capability traits and the headless reference device
    pub use crate::graphics_device::{
        Buffer, BufferDesc, BufferUsage, DrawPass, Fence, FenceWait, GraphicsDevice,
        BufferFormat, VertexFormat, IndexType, PrimitiveMode,
        HeadlessDevice, HeadlessConfig, HeadlessBuffer, HeadlessFence, HeadlessDrawPass, DrawCommand,
    };

    // Ring buffers
    pub use crate::ring::{
        BufferSlice, GrowPolicy, ReuseFallback, RingBuffer, RingBufferConfig, RingBufferStats,
        Slot, SlotState,
    };

    // Upload sessions
    pub use crate::upload::{Mesh, MeshIndices, SequentialIndexBuffer, UploadSession};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Pool sub-module
    pub mod pool {
        pub use crate::pool::*;
    }
}
