/// Ring buffer counters

/// Counters of one ring buffer, or of several after `merge`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingBufferStats {
    /// Successful `upload` calls
    pub uploads: u64,
    /// Bytes written by `upload`
    pub bytes_uploaded: u64,
    /// Device buffers created
    pub buffer_allocations: u64,
    /// Slot buffers replaced (growth or reuse fallback)
    pub buffer_replacements: u64,
    /// `rotate` calls
    pub rotations: u64,
    /// Unbounded fence waits that found the fence unsignaled
    pub blocking_waits: u64,
    /// Bounded reuse waits that timed out
    pub reuse_timeouts: u64,
    /// Retired buffers still waiting for their fences
    pub retired_pending: u64,
    /// Retired buffers released so far
    pub retired_released: u64,
}

impl RingBufferStats {
    /// Add every counter of `other` to `self`
    pub fn merge(&mut self, other: &RingBufferStats) {
        self.uploads += other.uploads;
        self.bytes_uploaded += other.bytes_uploaded;
        self.buffer_allocations += other.buffer_allocations;
        self.buffer_replacements += other.buffer_replacements;
        self.rotations += other.rotations;
        self.blocking_waits += other.blocking_waits;
        self.reuse_timeouts += other.reuse_timeouts;
        self.retired_pending += other.retired_pending;
        self.retired_released += other.retired_released;
    }
}
