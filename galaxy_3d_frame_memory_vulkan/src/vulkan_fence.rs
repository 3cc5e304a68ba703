/// VulkanFence - Vulkan implementation of the Fence trait

use galaxy_3d_frame_memory::galaxy3d::{Error, Fence, FenceWait, Result};
use galaxy_3d_frame_memory::{engine_error, engine_warn};
use ash::vk;
use std::sync::{Arc, Mutex};

use crate::vulkan_context::GpuContext;
use crate::vulkan_draw_pass::Recording;

/// Completion fence of one submission
///
/// Keeps the submitted recording alive until the fence is observed signaled.
pub struct VulkanFence {
    ctx: Arc<GpuContext>,
    fence: vk::Fence,
    recording: Mutex<Option<Recording>>,
}

impl VulkanFence {
    pub(crate) fn new(ctx: Arc<GpuContext>, fence: vk::Fence, recording: Option<Recording>) -> Self {
        Self {
            ctx,
            fence,
            recording: Mutex::new(recording),
        }
    }

    /// Raw Vulkan handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Release the command pool and bound buffers of a completed submission
    fn release_recording(&self) {
        self.recording
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

impl Fence for VulkanFence {
    fn is_signaled(&self) -> bool {
        let signaled = unsafe { self.ctx.device.get_fence_status(self.fence) };
        match signaled {
            Ok(true) => {
                self.release_recording();
                true
            }
            Ok(false) => false,
            Err(e) => {
                engine_warn!("galaxy3d::vulkan", "Failed to query fence status: {:?}", e);
                false
            }
        }
    }

    fn wait(&self, wait: FenceWait) -> Result<bool> {
        let result = unsafe { self.ctx.device.wait_for_fences(&[self.fence], true, wait.as_nanos()) };
        match result {
            Ok(()) => {
                self.release_recording();
                Ok(true)
            }
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(vk::Result::ERROR_DEVICE_LOST) => {
                engine_error!("galaxy3d::vulkan", "Device lost while waiting for a fence");
                Err(Error::DeviceLost("device lost while waiting for a fence".to_string()))
            }
            Err(e) => {
                engine_error!("galaxy3d::vulkan", "Failed to wait for fence: {:?}", e);
                Err(Error::BackendError(format!("Failed to wait for fence: {:?}", e)))
            }
        }
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            // The recording must not be freed while the device may still execute it
            if self.recording.get_mut().map_or(true, |recording| recording.is_some()) {
                self.ctx.device.wait_for_fences(&[self.fence], true, u64::MAX).ok();
            }
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}
