/// Pool module - CPU-side object reuse for the render thread

// Module declarations
pub mod arena;
pub mod object_pool;
pub mod scratch_pools;

// Re-export main types
pub use arena::{Arena, ArenaStrategy, ResetOnRecycle};
pub use object_pool::ObjectPool;
pub use scratch_pools::ScratchPools;
