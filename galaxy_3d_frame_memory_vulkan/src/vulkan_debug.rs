/// Vulkan Debug Messenger - Forwards validation layer messages to the engine log
///
/// Messages are routed through the `engine_*` macros under the
/// "galaxy3d::vulkan::validation" source and counted per severity.

use ash::vk;
use galaxy_3d_frame_memory::{engine_debug, engine_error, engine_info, engine_trace, engine_warn};
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};

const LOG_SOURCE: &str = "galaxy3d::vulkan::validation";

/// Message counts per severity, indexed by `severity_index`
#[allow(clippy::declare_interior_mutable_const)]
const ZERO: AtomicU32 = AtomicU32::new(0);
static VALIDATION_COUNTS: [AtomicU32; 4] = [ZERO; 4];

/// Counts of validation messages received, per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

fn severity_index(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> usize {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        0
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        1
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        2
    } else {
        3
    }
}

/// Get current validation statistics
pub fn get_validation_stats() -> ValidationStats {
    let [errors, warnings, info, verbose] = VALIDATION_COUNTS.each_ref().map(|count| count.load(Ordering::Relaxed));
    ValidationStats { errors, warnings, info, verbose }
}

/// Reset validation statistics (done when a device is created)
pub fn reset_validation_stats() {
    for count in &VALIDATION_COUNTS {
        count.store(0, Ordering::Relaxed);
    }
}

/// Severity flags the messenger subscribes to
pub(crate) fn messenger_severity_flags() -> vk::DebugUtilsMessageSeverityFlagsEXT {
    vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
        | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
}

fn message_type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Vulkan debug messenger callback
///
/// Called by the validation layers from any thread.
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = *p_callback_data;
    let message_id_name = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };

    VALIDATION_COUNTS[severity_index(message_severity)].fetch_add(1, Ordering::Relaxed);
    let type_str = message_type_name(message_type);

    match severity_index(message_severity) {
        0 => engine_error!(LOG_SOURCE, "[{}] {}: {}", type_str, message_id_name, message),
        1 => engine_warn!(LOG_SOURCE, "[{}] {}: {}", type_str, message_id_name, message),
        2 => engine_info!(LOG_SOURCE, "[{}] {}: {}", type_str, message_id_name, message),
        _ if type_str == "Performance" => engine_debug!(LOG_SOURCE, "[{}] {}: {}", type_str, message_id_name, message),
        _ => engine_trace!(LOG_SOURCE, "[{}] {}: {}", type_str, message_id_name, message),
    }

    vk::FALSE // Don't abort Vulkan execution
}

#[cfg(test)]
#[path = "vulkan_debug_tests.rs"]
mod tests;
