/// VulkanDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Windowless: the device renders into render passes and framebuffers the
/// caller creates with the raw handles (`ash_device`, `physical_device`).

use galaxy_3d_frame_memory::galaxy3d::{
    Buffer, BufferDesc, DrawPass, Error, Fence, GraphicsDevice, Result,
};
use galaxy_3d_frame_memory::{engine_debug, engine_err, engine_error, engine_info, engine_warn_err};
use ash::vk;
use gpu_allocator::vulkan::{AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use std::ffi::{CStr, CString};
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_draw_pass::VulkanDrawPass;
use crate::vulkan_fence::VulkanFence;
use crate::vulkan_format::{buffer_usage_to_vk, memory_location};

const LOG_SOURCE: &str = "galaxy3d::vulkan";

/// Vulkan device configuration
#[derive(Debug, Clone)]
pub struct VulkanDeviceConfig {
    /// Application name reported to the driver
    pub application_name: String,
    /// Enable VK_LAYER_KHRONOS_validation and forward its messages to the log
    /// (on by default in debug builds and with the `vulkan-validation` feature)
    pub enable_validation: bool,
}

impl Default for VulkanDeviceConfig {
    fn default() -> Self {
        Self {
            application_name: "Galaxy3D Application".to_string(),
            enable_validation: cfg!(debug_assertions) || cfg!(feature = "vulkan-validation"),
        }
    }
}

/// Vulkan device implementation
pub struct VulkanDevice {
    /// Physical device
    physical_device: vk::PhysicalDevice,
    /// Physical device name
    name: String,
    /// Shared GPU context for all resources
    /// Owns device, allocator, instance and debug messenger destruction
    ctx: Arc<GpuContext>,
}

impl VulkanDevice {
    /// Create a new Vulkan device on the first GPU with a graphics queue
    pub fn new(config: VulkanDeviceConfig) -> Result<Self> {
        unsafe {
            // Create Vulkan Entry
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            // Application Info
            let application_name = CString::new(config.application_name.as_str())
                .map_err(|e| Error::InitializationFailed(format!("Invalid application name: {}", e)))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&application_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Galaxy3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            // Add debug utils extension if validation is enabled
            let mut extension_names = Vec::new();
            if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            // Validation layers
            let layer_names = if config.enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            // Setup debug messenger if validation is enabled
            let debug_messenger = if config.enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                crate::vulkan_debug::reset_validation_stats();

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(crate::vulkan_debug::messenger_severity_flags())
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                    )
                    .pfn_user_callback(Some(crate::vulkan_debug::vulkan_debug_callback));

                match debug_utils.create_debug_utils_messenger(&debug_info, None) {
                    Ok(messenger) => Some((debug_utils, messenger)),
                    Err(e) => {
                        instance.destroy_instance(None);
                        engine_error!(LOG_SOURCE, "Failed to create debug messenger: {:?}", e);
                        return Err(Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e)));
                    }
                }
            } else {
                None
            };

            // From here on, failures are cleaned up by the instance guard
            let setup = InstanceGuard { instance: Some(instance), debug_messenger };

            // Pick Physical Device with a graphics queue
            let instance = setup.instance()?;
            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to enumerate physical devices: {:?}", e);
                    Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
                })?;

            let (physical_device, graphics_family_index) = physical_devices
                .into_iter()
                .find_map(|physical_device| {
                    instance
                        .get_physical_device_queue_family_properties(physical_device)
                        .iter()
                        .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                        .map(|index| (physical_device, index as u32))
                })
                .ok_or_else(|| {
                    engine_error!(LOG_SOURCE, "No Vulkan-capable GPU with a graphics queue found");
                    Error::InitializationFailed("No Vulkan-capable GPU with a graphics queue found".to_string())
                })?;

            let properties = instance.get_physical_device_properties(physical_device);
            let name = CStr::from_ptr(properties.device_name.as_ptr())
                .to_string_lossy()
                .into_owned();

            // Create Logical Device
            let queue_priorities = [1.0];
            let queue_create_infos = [
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(graphics_family_index)
                    .queue_priorities(&queue_priorities),
            ];

            let device_features = vk::PhysicalDeviceFeatures::default();

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!(LOG_SOURCE, "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_family_index, 0);

            // Create GPU allocator
            let allocator = match Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            }) {
                Ok(allocator) => allocator,
                Err(e) => {
                    device.destroy_device(None);
                    engine_error!(LOG_SOURCE, "Failed to create GPU allocator: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to create allocator: {:?}", e)));
                }
            };

            let (instance, debug_messenger) = setup.release()?;
            let ctx = Arc::new(GpuContext::new(
                entry,
                instance,
                device,
                allocator,
                graphics_queue,
                graphics_family_index,
                debug_messenger,
            ));

            engine_info!(LOG_SOURCE, "Vulkan device '{}' created (graphics queue family {}, validation {})",
                name, graphics_family_index, config.enable_validation);

            Ok(Self {
                physical_device,
                name,
                ctx,
            })
        }
    }

    /// Create an empty draw pass to record into
    pub fn create_draw_pass(&self, label: &str) -> VulkanDrawPass {
        VulkanDrawPass::new(Arc::clone(&self.ctx), label)
    }

    /// Wait until the device is idle
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx.device.device_wait_idle()
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to wait for device idle: {:?}", e))
        }
    }

    /// Logical device, for creating render passes, framebuffers and pipelines
    pub fn ash_device(&self) -> &ash::Device {
        &self.ctx.device
    }

    /// Physical device
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Graphics queue family index
    pub fn graphics_queue_family(&self) -> u32 {
        self.ctx.graphics_queue_family
    }
}

impl GraphicsDevice for VulkanDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        if desc.size == 0 {
            return Err(engine_warn_err!(LOG_SOURCE, "Buffer '{}' requested with size 0", desc.label));
        }

        unsafe {
            let buffer_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(buffer_usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = self.ctx.device.create_buffer(&buffer_info, None)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to create buffer '{}': {:?}", desc.label, e))?;

            let requirements = self.ctx.device.get_buffer_memory_requirements(buffer);

            let allocation = self.ctx.allocator()
                .allocate(&AllocationCreateDesc {
                    name: &desc.label,
                    requirements,
                    location: memory_location(desc.usage),
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.ctx.device.destroy_buffer(buffer, None);
                    return Err(match e {
                        gpu_allocator::AllocationError::OutOfMemory => {
                            engine_error!(LOG_SOURCE, "Out of GPU memory for '{}' ({} bytes)", desc.label, desc.size);
                            Error::OutOfMemory
                        }
                        other => engine_err!(LOG_SOURCE, "Failed to allocate memory for '{}': {:?}", desc.label, other),
                    });
                }
            };

            if let Err(e) = self.ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                self.ctx.allocator().free(allocation).ok();
                self.ctx.device.destroy_buffer(buffer, None);
                return Err(engine_err!(LOG_SOURCE, "Failed to bind memory for '{}': {:?}", desc.label, e));
            }

            engine_debug!(LOG_SOURCE, "Created {} buffer '{}' ({} bytes)",
                desc.usage.kind_name(), desc.label, desc.size);

            Ok(Arc::new(VulkanBuffer::new(
                Arc::clone(&self.ctx),
                buffer,
                allocation,
                desc.size,
                desc.usage,
            )))
        }
    }

    fn submit(&self, pass: &mut dyn DrawPass) -> Result<Arc<dyn Fence>> {
        let pass = pass
            .as_any_mut()
            .downcast_mut::<VulkanDrawPass>()
            .ok_or_else(|| Error::InvalidResource("VulkanDevice can only submit a VulkanDrawPass".to_string()))?;
        let recording = pass.finish()?;

        unsafe {
            let fence = self.ctx.device.create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| engine_err!(LOG_SOURCE, "Failed to create fence: {:?}", e))?;

            let command_buffers: Vec<vk::CommandBuffer> =
                recording.iter().map(|recording| recording.command_buffer).collect();
            let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
            // An empty pass still gets a fence ordered after all prior work
            let submits: &[vk::SubmitInfo] = if command_buffers.is_empty() { &[] } else { std::slice::from_ref(&submit_info) };

            let result = {
                let queue = self.ctx.graphics_queue();
                self.ctx.device.queue_submit(*queue, submits, fence)
            };
            if let Err(e) = result {
                self.ctx.device.destroy_fence(fence, None);
                if e == vk::Result::ERROR_DEVICE_LOST {
                    engine_error!(LOG_SOURCE, "Device lost while submitting '{}'", pass.label());
                    return Err(Error::DeviceLost(format!("device lost while submitting '{}'", pass.label())));
                }
                return Err(engine_err!(LOG_SOURCE, "Failed to submit '{}': {:?}", pass.label(), e));
            }

            Ok(Arc::new(VulkanFence::new(Arc::clone(&self.ctx), fence, recording)))
        }
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        // Buffers and fences may still hold the context; GpuContext tears down last
        self.wait_idle().ok();
    }
}

/// Owns the instance and messenger until the context takes them over
struct InstanceGuard {
    instance: Option<ash::Instance>,
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl InstanceGuard {
    fn instance(&self) -> Result<&ash::Instance> {
        self.instance
            .as_ref()
            .ok_or_else(|| Error::InitializationFailed("Vulkan instance already released".to_string()))
    }

    #[allow(clippy::type_complexity)]
    fn release(mut self) -> Result<(ash::Instance, Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>)> {
        let instance = self.instance
            .take()
            .ok_or_else(|| Error::InitializationFailed("Vulkan instance already released".to_string()))?;
        Ok((instance, self.debug_messenger.take()))
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            if let Some(instance) = self.instance.take() {
                instance.destroy_instance(None);
            }
        }
    }
}
