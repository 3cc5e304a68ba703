/// Slot - one buffer of a ring with its write cursor and fence

use std::sync::Arc;
use crate::graphics_device::{Buffer, Fence};

/// Where a slot stands with respect to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No submission references the slot
    Idle,
    /// A submission reading the slot has not finished
    Submitted,
    /// The last submission reading the slot has finished
    Signaled,
}

/// One buffer of a ring
///
/// Invariant: `write_cursor <= capacity()`. Growth replaces `buffer`, it is
/// never resized in place.
pub struct Slot {
    pub(crate) buffer: Option<Arc<dyn Buffer>>,
    pub(crate) write_cursor: u64,
    pub(crate) fence: Option<Arc<dyn Fence>>,
    pub(crate) generation: u64,
    /// Something was uploaded since the slot became current
    pub(crate) written: bool,
    /// Capacity of the last buffer this slot held (kept across reallocation)
    pub(crate) capacity_hint: u64,
}

impl Slot {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            buffer: None,
            write_cursor: 0,
            fence: None,
            generation,
            written: false,
            capacity_hint: 0,
        }
    }

    /// Current buffer, `None` until the first upload (or after a reallocation)
    pub fn buffer(&self) -> Option<&Arc<dyn Buffer>> {
        self.buffer.as_ref()
    }

    /// Size of the current buffer in bytes (0 without a buffer)
    pub fn capacity(&self) -> u64 {
        self.buffer.as_ref().map_or(0, |buffer| buffer.size())
    }

    /// Next write offset
    pub fn write_cursor(&self) -> u64 {
        self.write_cursor
    }

    /// Bytes still free after the cursor
    pub fn remaining(&self) -> u64 {
        self.capacity() - self.write_cursor
    }

    /// Generation stamped on the slot when it last became current
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fence of the last submission that read the slot
    pub fn fence(&self) -> Option<&Arc<dyn Fence>> {
        self.fence.as_ref()
    }

    /// Observed device state
    pub fn state(&self) -> SlotState {
        match &self.fence {
            None => SlotState::Idle,
            Some(fence) if fence.is_signaled() => SlotState::Signaled,
            Some(_) => SlotState::Submitted,
        }
    }

    /// Whether the device may still read the slot's buffer
    pub fn is_in_flight(&self) -> bool {
        self.state() == SlotState::Submitted
    }
}
