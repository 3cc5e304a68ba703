/// Conversions from frame memory types to Vulkan enums and flags

use ash::vk;
use galaxy_3d_frame_memory::galaxy3d::{BufferFormat, BufferUsage, IndexType, VertexFormat};
use gpu_allocator::MemoryLocation;

/// Vulkan usage flags for a buffer
pub fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsage::STORAGE) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if usage.contains(BufferUsage::COPY_DST) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    flags
}

/// Memory location for a buffer
///
/// Host-writable buffers live in host-visible memory that stays persistently
/// mapped; everything else is device local.
pub fn memory_location(usage: BufferUsage) -> MemoryLocation {
    if usage.contains(BufferUsage::MAP_WRITE) {
        MemoryLocation::CpuToGpu
    } else {
        MemoryLocation::GpuOnly
    }
}

pub fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::U16 => vk::IndexType::UINT16,
        IndexType::U32 => vk::IndexType::UINT32,
    }
}

pub fn buffer_format_to_vk(format: BufferFormat) -> vk::Format {
    match format {
        // Float formats
        BufferFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        BufferFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        BufferFormat::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        BufferFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        // Integer formats
        BufferFormat::R32_UINT => vk::Format::R32_UINT,
        BufferFormat::R16G16_UNORM => vk::Format::R16G16_UNORM,
        BufferFormat::R16G16_SINT => vk::Format::R16G16_SINT,
        // Byte formats
        BufferFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        BufferFormat::R8G8B8A8_SNORM => vk::Format::R8G8B8A8_SNORM,
    }
}

/// Per-vertex input binding for an interleaved stream
pub fn vertex_binding_description(binding: u32, format: &VertexFormat) -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription::default()
        .binding(binding)
        .stride(format.stride())
        .input_rate(vk::VertexInputRate::VERTEX)
}

/// Attribute descriptions with consecutive locations and packed offsets
pub fn vertex_attribute_descriptions(binding: u32, format: &VertexFormat) -> Vec<vk::VertexInputAttributeDescription> {
    let mut offset = 0;
    format
        .attributes()
        .iter()
        .enumerate()
        .map(|(location, attribute)| {
            let description = vk::VertexInputAttributeDescription::default()
                .location(location as u32)
                .binding(binding)
                .format(buffer_format_to_vk(*attribute))
                .offset(offset);
            offset += attribute.size_bytes();
            description
        })
        .collect()
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
