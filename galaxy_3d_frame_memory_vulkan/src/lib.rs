/*!
# Galaxy 3D Frame Memory - Vulkan Backend

Vulkan implementation of the galaxy_3d_frame_memory device traits.

This crate provides a windowless Vulkan device using the Ash library for
Vulkan bindings and gpu-allocator for memory management. Ring buffers get
persistently mapped host-visible buffers; fences keep each submitted
command buffer alive until the device is done with it.
*/

// Vulkan implementation modules
mod vulkan_context;
mod vulkan_device;
mod vulkan_buffer;
mod vulkan_fence;
mod vulkan_draw_pass;
mod vulkan_debug;
pub mod vulkan_format;

pub use vulkan_device::{VulkanDevice, VulkanDeviceConfig};
pub use vulkan_buffer::VulkanBuffer;
pub use vulkan_fence::VulkanFence;
pub use vulkan_draw_pass::VulkanDrawPass;

// Re-export debug utilities
pub use vulkan_debug::{get_validation_stats, reset_validation_stats, ValidationStats};
