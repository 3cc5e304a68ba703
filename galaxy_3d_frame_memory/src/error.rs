//! Error types for Galaxy3D frame memory
//!
//! This module defines the error type shared by the device capability layer,
//! the ring buffers, the upload sessions and the backends, plus the
//! `engine_err!` family of macros that log an error at the point it is built.

use std::fmt;

/// Result type for Galaxy3D frame memory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D frame memory errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, headless device, etc.)
    BackendError(String),

    /// Out of GPU memory (buffer creation or growth)
    OutOfMemory,

    /// Invalid resource (buffer, slice, format, etc.)
    InvalidResource(String),

    /// Initialization failed (invalid configuration, device setup)
    InitializationFailed(String),

    /// The device stopped answering fence queries
    DeviceLost(String),

    /// Operation called in a state that does not allow it
    InvalidState(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::DeviceLost(msg) => write!(f, "Device lost: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR message and build an `Error::BackendError` with the same text
///
/// # Example
///
/// ```no_run
/// # use galaxy_3d_frame_memory::engine_err;
/// let err = engine_err!("galaxy3d::vulkan", "Failed to create fence: {}", -3);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::galaxy3d::Error::BackendError(message)
    }};
}

/// Log a WARN message and build an `Error::BackendError` with the same text
#[macro_export]
macro_rules! engine_warn_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_warn!($source, "{}", message);
        $crate::galaxy3d::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return early with `Err(Error::BackendError)`
///
/// # Example
///
/// ```no_run
/// # use galaxy_3d_frame_memory::engine_bail;
/// fn check(size: u64) -> galaxy_3d_frame_memory::galaxy3d::Result<()> {
///     if size == 0 {
///         engine_bail!("galaxy3d::RingBuffer", "Buffer size must be non-zero");
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

/// Log a WARN message and return early with `Err(Error::BackendError)`
#[macro_export]
macro_rules! engine_bail_warn {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_warn_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
