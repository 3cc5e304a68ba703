/// Fence trait - completion token of a device submission

use std::time::Duration;
use crate::error::Result;

/// How long a fence wait may block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceWait {
    /// Zero-duration poll
    Poll,
    /// Block for at most this long
    Timeout(Duration),
    /// Block until the fence signals
    Indefinite,
}

impl FenceWait {
    /// Timeout in nanoseconds as device APIs expect it (`u64::MAX` = indefinite)
    pub fn as_nanos(&self) -> u64 {
        match self {
            FenceWait::Poll => 0,
            FenceWait::Timeout(duration) => u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX - 1),
            FenceWait::Indefinite => u64::MAX,
        }
    }

    /// Whether this wait may return before the fence signals
    pub fn is_bounded(&self) -> bool {
        !matches!(self, FenceWait::Indefinite)
    }
}

impl From<Duration> for FenceWait {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            FenceWait::Poll
        } else {
            FenceWait::Timeout(duration)
        }
    }
}

/// Fence resource trait
///
/// Created by `GraphicsDevice::submit()` for one submission. Frame memory only
/// observes fences; it never resets or re-arms them.
pub trait Fence: Send + Sync {
    /// Non-blocking poll
    fn is_signaled(&self) -> bool;

    /// Wait for completion
    ///
    /// Returns `Ok(false)` when a bounded wait times out. An error means the
    /// device could not answer (e.g. device lost).
    fn wait(&self, wait: FenceWait) -> Result<bool>;
}
