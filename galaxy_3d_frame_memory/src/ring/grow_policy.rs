/// Size selection for slot buffer replacement

/// How a slot buffer grows when an upload does not fit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowPolicy {
    /// `max(next_power_of_two(requested), current * 3 / 2)`, at least `min_capacity`
    Geometric {
        /// Smallest buffer ever created
        min_capacity: u64,
    },
    /// `max(min_capacity, requested, current)` rounded up to `1 << padding_shift`
    Padded {
        /// Log2 of the rounding granule (7 = 128 bytes)
        padding_shift: u32,
        /// Smallest buffer ever created
        min_capacity: u64,
    },
    /// Exactly the requested size
    Exact,
}

impl GrowPolicy {
    /// 128-byte padding with no minimum
    pub const PADDED_128: GrowPolicy = GrowPolicy::Padded { padding_shift: 7, min_capacity: 0 };

    /// Capacity of the replacement buffer
    ///
    /// # Arguments
    ///
    /// * `current` - Capacity of the buffer being replaced (0 if none)
    /// * `requested` - Bytes the replacement must hold
    ///
    /// # Returns
    ///
    /// A capacity `>= requested` and `>= 1`.
    pub fn next_capacity(&self, current: u64, requested: u64) -> u64 {
        let capacity = match *self {
            GrowPolicy::Geometric { min_capacity } => {
                let doubled = requested.checked_next_power_of_two().unwrap_or(requested);
                doubled.max(current.saturating_mul(3) / 2).max(min_capacity)
            }
            GrowPolicy::Padded { padding_shift, min_capacity } => {
                let base = min_capacity.max(requested).max(current);
                let mask = (1u64 << padding_shift.min(63)) - 1;
                base.checked_add(mask).map_or(base, |padded| padded & !mask)
            }
            GrowPolicy::Exact => requested,
        };
        capacity.max(requested).max(1)
    }
}

impl Default for GrowPolicy {
    fn default() -> Self {
        GrowPolicy::Geometric { min_capacity: 4096 }
    }
}

#[cfg(test)]
#[path = "grow_policy_tests.rs"]
mod tests;
