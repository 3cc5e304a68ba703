/// VulkanDrawPass - Vulkan implementation of the DrawPass trait
///
/// Records binds and draws into a primary command buffer. The command buffer
/// is begun on first use; `VulkanDevice::submit` ends and submits it.

use galaxy_3d_frame_memory::galaxy3d::{Buffer, DrawPass, Error, IndexType, Result};
use galaxy_3d_frame_memory::engine_err;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::index_type_to_vk;

/// Command buffer being recorded, plus what it references
///
/// Owned by the fence once submitted, so the pool and the bound buffers
/// live until the device is done with them.
pub(crate) struct Recording {
    ctx: Arc<GpuContext>,
    command_pool: vk::CommandPool,
    pub(crate) command_buffer: vk::CommandBuffer,
    /// Buffers bound by the recorded commands
    bound_buffers: Vec<Arc<dyn Buffer>>,
}

impl Recording {
    fn begin(ctx: &Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT);

            let command_pool = ctx.device.create_command_pool(&command_pool_create_info, None)
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to create command pool: {:?}", e))?;

            // From here on, Drop destroys the pool
            let mut recording = Self {
                ctx: Arc::clone(ctx),
                command_pool,
                command_buffer: vk::CommandBuffer::null(),
                bound_buffers: Vec::new(),
            };

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = ctx.device.allocate_command_buffers(&command_buffer_allocate_info)
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to allocate command buffer: {:?}", e))?;
            recording.command_buffer = command_buffers
                .first()
                .copied()
                .ok_or_else(|| engine_err!("galaxy3d::vulkan", "No command buffer allocated"))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            ctx.device.begin_command_buffer(recording.command_buffer, &begin_info)
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to begin command buffer: {:?}", e))?;

            Ok(recording)
        }
    }
}

impl Drop for Recording {
    fn drop(&mut self) {
        unsafe {
            // Frees the command buffer too
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Vulkan draw pass implementation
pub struct VulkanDrawPass {
    /// Shared GPU context
    ctx: Arc<GpuContext>,
    /// Debug label
    label: String,
    /// Active recording (None until the first command)
    recording: Option<Recording>,
    /// Whether we're inside a render pass
    in_render_pass: bool,
}

impl VulkanDrawPass {
    pub(crate) fn new(ctx: Arc<GpuContext>, label: &str) -> Self {
        Self {
            ctx,
            label: label.to_string(),
            recording: None,
            in_render_pass: false,
        }
    }

    /// Debug label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Underlying command buffer, if recording has started
    ///
    /// Lets callers record their own commands (pipelines, viewports,
    /// descriptor sets) around the draws issued by frame memory.
    pub fn command_buffer(&self) -> Option<vk::CommandBuffer> {
        self.recording.as_ref().map(|recording| recording.command_buffer)
    }

    /// Whether we're inside a render pass
    pub fn in_render_pass(&self) -> bool {
        self.in_render_pass
    }

    /// Begin a render pass on the recording
    ///
    /// # Arguments
    ///
    /// * `render_pass` - Render pass handle
    /// * `framebuffer` - Framebuffer compatible with `render_pass`
    /// * `extent` - Render area, from the origin
    /// * `clear_values` - One value per attachment with a CLEAR load op
    pub fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_values: &[vk::ClearValue],
    ) -> Result<()> {
        if self.in_render_pass {
            return Err(Error::InvalidState(format!("'{}' is already inside a render pass", self.label)));
        }
        let command_buffer = self.recording()?.command_buffer;

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(clear_values);

        unsafe {
            self.ctx.device.cmd_begin_render_pass(command_buffer, &render_pass_info, vk::SubpassContents::INLINE);
        }
        self.in_render_pass = true;
        Ok(())
    }

    /// End the current render pass
    pub fn end_render_pass(&mut self) -> Result<()> {
        if !self.in_render_pass {
            return Err(Error::InvalidState(format!("'{}' is not inside a render pass", self.label)));
        }
        let command_buffer = self.recording()?.command_buffer;
        unsafe {
            self.ctx.device.cmd_end_render_pass(command_buffer);
        }
        self.in_render_pass = false;
        Ok(())
    }

    /// Recording, begun on first use
    fn recording(&mut self) -> Result<&mut Recording> {
        if self.recording.is_none() {
            self.recording = Some(Recording::begin(&self.ctx)?);
        }
        self.recording
            .as_mut()
            .ok_or_else(|| Error::InvalidState("draw pass has no recording".to_string()))
    }

    /// End the recording and hand it over for submission
    ///
    /// Closes an open render pass. Returns None when nothing was recorded.
    pub(crate) fn finish(&mut self) -> Result<Option<Recording>> {
        if self.in_render_pass {
            self.end_render_pass()?;
        }
        let Some(recording) = self.recording.take() else {
            return Ok(None);
        };
        unsafe {
            self.ctx.device.end_command_buffer(recording.command_buffer)
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to end command buffer for '{}': {:?}", self.label, e))?;
        }
        Ok(Some(recording))
    }

    fn vk_buffer<'a>(&self, buffer: &'a Arc<dyn Buffer>) -> Result<&'a VulkanBuffer> {
        buffer
            .as_any()
            .downcast_ref::<VulkanBuffer>()
            .ok_or_else(|| Error::InvalidResource(format!("'{}' was given a buffer from another backend", self.label)))
    }
}

impl DrawPass for VulkanDrawPass {
    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        let handle = self.vk_buffer(buffer)?.handle();
        let ctx = Arc::clone(&self.ctx);
        let recording = self.recording()?;
        unsafe {
            ctx.device.cmd_bind_vertex_buffers(recording.command_buffer, 0, &[handle], &[offset]);
        }
        recording.bound_buffers.push(Arc::clone(buffer));
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()> {
        let handle = self.vk_buffer(buffer)?.handle();
        let ctx = Arc::clone(&self.ctx);
        let recording = self.recording()?;
        unsafe {
            ctx.device.cmd_bind_index_buffer(recording.command_buffer, handle, offset, index_type_to_vk(index_type));
        }
        recording.bound_buffers.push(Arc::clone(buffer));
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, base_vertex: i32, instance_count: u32) -> Result<()> {
        if !self.in_render_pass {
            return Err(Error::InvalidState(format!("'{}' draw_indexed outside of a render pass", self.label)));
        }
        let ctx = Arc::clone(&self.ctx);
        let recording = self.recording()?;
        unsafe {
            ctx.device.cmd_draw_indexed(
                recording.command_buffer,
                index_count,
                instance_count,
                first_index,
                base_vertex,
                0, // first_instance
            );
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
