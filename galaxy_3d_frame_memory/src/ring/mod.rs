/// Ring module - fence-gated, N-buffered device memory for per-frame uploads

// Module declarations
pub mod config;
pub mod grow_policy;
pub mod ring_buffer;
pub mod slice;
pub mod slot;
pub mod stats;
pub(crate) mod retired;

// Re-export main types
pub use config::{ReuseFallback, RingBufferConfig};
pub use grow_policy::GrowPolicy;
pub use ring_buffer::RingBuffer;
pub use slice::BufferSlice;
pub use slot::{Slot, SlotState};
pub use stats::RingBufferStats;
