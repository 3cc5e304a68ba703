/// GraphicsDevice trait - the capability set consumed by frame memory

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Buffer, BufferDesc, DrawPass, Fence};

/// Graphics device capabilities
///
/// This is the whole surface frame memory needs from a backend:
/// CPU-writable buffer creation and fenced submission of a recorded pass.
/// Implemented by `HeadlessDevice` and by the Vulkan backend.
pub trait GraphicsDevice: Send + Sync {
    /// Backend name for logs ("headless", "vulkan", ...)
    fn name(&self) -> &str;

    /// Create a CPU-writable buffer
    ///
    /// # Errors
    ///
    /// `Error::OutOfMemory` when the device cannot satisfy the allocation.
    /// Callers treat it as fatal.
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Finish recording `pass` and submit it
    ///
    /// # Returns
    ///
    /// A fence that signals once the device has finished executing the
    /// submission, including every vertex/index read it performs.
    fn submit(&self, pass: &mut dyn DrawPass) -> Result<Arc<dyn Fence>>;
}
