/// Ring buffer configuration

use std::time::Duration;
use crate::error::{Error, Result};
use crate::ring::GrowPolicy;

/// What `rotate()` does when the slot it lands on is still in use after `reuse_timeout`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReuseFallback {
    /// Wait for the slot's fence without a timeout
    Block,
    /// Retire the slot's buffer and give the slot a fresh one at its next upload
    #[default]
    Reallocate,
}

/// Configuration for one ring buffer
#[derive(Debug, Clone, PartialEq)]
pub struct RingBufferConfig {
    /// Number of slots in the ring (2 = double buffering, 3 = triple buffering)
    pub slot_count: usize,

    /// Bytes allocated per slot at construction (0 = allocate on first upload)
    pub initial_capacity: u64,

    /// Replacement size when an upload does not fit
    pub grow_policy: GrowPolicy,

    /// Longest bounded wait on a slot fence during `rotate()`
    pub reuse_timeout: Duration,

    /// Action taken when the bounded wait times out
    pub reuse_fallback: ReuseFallback,
}

impl RingBufferConfig {
    /// Ring with `slot_count` slots of `initial_capacity` bytes, other settings default
    pub fn with_slots(slot_count: usize, initial_capacity: u64) -> Self {
        Self {
            slot_count,
            initial_capacity,
            ..Default::default()
        }
    }

    /// Check the configuration
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` when `slot_count` is 0.
    pub fn validate(&self) -> Result<()> {
        if self.slot_count == 0 {
            return Err(Error::InitializationFailed("ring buffer needs at least one slot".to_string()));
        }
        Ok(())
    }
}

impl Default for RingBufferConfig {
    fn default() -> Self {
        Self {
            slot_count: 3,
            initial_capacity: 0,
            grow_policy: GrowPolicy::default(),
            reuse_timeout: Duration::from_millis(2),
            reuse_fallback: ReuseFallback::default(),
        }
    }
}
