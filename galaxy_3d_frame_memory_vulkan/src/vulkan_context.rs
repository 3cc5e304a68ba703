/// GpuContext - Shared GPU resources for all Vulkan objects
///
/// Contains everything buffers, fences and passes need:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Queue for command submission
///
/// The context is the last owner of the device: it is destroyed when the
/// device, every buffer, fence and pass that references it are dropped.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

/// Shared GPU context for all Vulkan resources.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop to ensure it's dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics queue (externally synchronized, hence the mutex)
    graphics_queue: Mutex<vk::Queue>,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// Debug utils loader and messenger (validation enabled)
    pub(crate) debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,

    /// Vulkan instance
    instance: ash::Instance,

    /// Loaded Vulkan library, must outlive the instance
    _entry: ash::Entry,
}

impl GpuContext {
    /// Create a new GPU context
    ///
    /// # Arguments
    ///
    /// * `entry` - Loaded Vulkan library
    /// * `instance` - Vulkan instance
    /// * `device` - Vulkan logical device
    /// * `allocator` - GPU memory allocator
    /// * `graphics_queue` - Graphics queue for command submission
    /// * `graphics_queue_family` - Graphics queue family index
    /// * `debug_messenger` - Debug utils loader and messenger (if validation enabled)
    pub fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        device: ash::Device,
        allocator: Allocator,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue: Mutex::new(graphics_queue),
            graphics_queue_family,
            debug_messenger,
            instance,
            _entry: entry,
        }
    }

    /// Lock the allocator (a poisoned lock is still usable)
    pub fn allocator(&self) -> MutexGuard<'_, Allocator> {
        self.allocator.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lock the graphics queue for a submission
    pub fn graphics_queue(&self) -> MutexGuard<'_, vk::Queue> {
        self.graphics_queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish
            self.device.device_wait_idle().ok();

            // 1. Drop allocator: free VkDeviceMemory pages BEFORE destroying device
            ManuallyDrop::drop(&mut self.allocator);

            // 2. Destroy debug messenger BEFORE device and instance
            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            // 3. Destroy device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
