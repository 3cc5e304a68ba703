/// Deferred release of replaced ring buffers
///
/// A buffer replaced by growth or by the reuse fallback may still be read by
/// submissions in flight. It is kept here with every fence that may reference
/// it until all of them have signaled; only then can it be dropped or handed
/// back to a slot.

use std::sync::Arc;

use crate::error::Error;
use crate::graphics_device::{Buffer, BufferDesc, BufferUsage, Fence, GraphicsDevice};
use crate::pool::arena::ArenaStrategy;

/// Buffer parked in the recycler
pub(crate) struct RetiredBuffer {
    pub(crate) buffer: Arc<dyn Buffer>,
    /// Fences of submissions that may read `buffer`
    pub(crate) fences: Vec<Arc<dyn Fence>>,
    /// Draws of the current cycle may reference `buffer` but are not submitted yet
    pub(crate) awaiting_submission: bool,
}

impl RetiredBuffer {
    pub(crate) fn new(buffer: Arc<dyn Buffer>, fence: Option<Arc<dyn Fence>>, awaiting_submission: bool) -> Self {
        Self {
            buffer,
            fences: fence.into_iter().collect(),
            awaiting_submission,
        }
    }

    /// No submission, past or pending, can still read the buffer
    pub(crate) fn is_idle(&self) -> bool {
        !self.awaiting_submission && self.fences.iter().all(|fence| fence.is_signaled())
    }

    /// Track the fence of a submission that may have read the buffer
    pub(crate) fn attach_fence(&mut self, fence: &Arc<dyn Fence>) {
        if !self.fences.iter().any(|known| Arc::ptr_eq(known, fence)) {
            self.fences.push(Arc::clone(fence));
        }
    }
}

/// Buffer wanted by a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BufferRequest {
    /// Slot the buffer is for (used in the debug label)
    pub(crate) slot: usize,
    /// Smallest acceptable size of a recycled buffer
    pub(crate) min_size: u64,
    /// Size of a newly created buffer
    pub(crate) size: u64,
}

/// Fence-gated strategy: a parked buffer is reusable once idle and large enough
pub(crate) struct RetiredBuffers {
    device: Arc<dyn GraphicsDevice>,
    label: String,
    usage: BufferUsage,
}

impl RetiredBuffers {
    pub(crate) fn new(device: Arc<dyn GraphicsDevice>, label: &str, usage: BufferUsage) -> Self {
        Self {
            device,
            label: label.to_string(),
            usage: usage | BufferUsage::MAP_WRITE,
        }
    }

    pub(crate) fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl ArenaStrategy for RetiredBuffers {
    type Item = RetiredBuffer;
    type Request = BufferRequest;
    type Error = Error;

    fn accepts(&self, item: &RetiredBuffer, request: &BufferRequest) -> bool {
        item.is_idle() && item.buffer.size() >= request.min_size
    }

    fn create(&mut self, request: &BufferRequest) -> Result<RetiredBuffer, Error> {
        let buffer = self.device.create_buffer(&BufferDesc {
            label: format!("{} #{}", self.label, request.slot),
            size: request.size,
            usage: self.usage,
        })?;
        Ok(RetiredBuffer::new(buffer, None, false))
    }

    fn reset(&mut self, item: &mut RetiredBuffer) {
        item.fences.retain(|fence| !fence.is_signaled());
    }
}
