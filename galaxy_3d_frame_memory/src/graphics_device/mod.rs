/// Graphics device module - the capability set frame memory needs from a backend

// Module declarations
pub mod graphics_device;
pub mod buffer;
pub mod fence;
pub mod draw_pass;
pub mod vertex_format;
pub mod headless;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use buffer::*;
pub use fence::*;
pub use draw_pass::*;
pub use vertex_format::*;
pub use headless::{HeadlessDevice, HeadlessConfig, HeadlessBuffer, HeadlessFence, HeadlessDrawPass, DrawCommand};
