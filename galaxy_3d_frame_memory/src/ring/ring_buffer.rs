/// RingBuffer - N-buffered streaming allocator for one vertex or index stream
///
/// Each slot owns one CPU-writable device buffer. Uploads append to the
/// current slot; `rotate()` moves to the next slot once per submission cycle
/// so the CPU writes one slot while the device still reads the others.
///
/// - An upload that does not fit replaces the current slot's buffer with a
///   larger one (see `GrowPolicy`) and is written at offset 0 of it. The old
///   buffer is retired until every fence that may read it has signaled.
/// - `rotate()` onto a slot whose fence has not signaled waits at most
///   `reuse_timeout`, then applies `ReuseFallback`.
/// - `clear()` may only run once `is_safe_for_close()` holds or the ring
///   has been drained.
///
/// The ring only observes fences. The caller attaches them with
/// `mark_submitted()` after submitting the pass that read the uploads.

use std::marker::PhantomData;
use std::mem::size_of;
use std::sync::Arc;
use bytemuck::Pod;

use crate::error::{Error, Result};
use crate::graphics_device::{BufferUsage, Fence, FenceWait, GraphicsDevice};
use crate::pool::arena::Arena;
use crate::ring::retired::{BufferRequest, RetiredBuffer, RetiredBuffers};
use crate::ring::{BufferSlice, ReuseFallback, RingBufferConfig, RingBufferStats, Slot};
use crate::{engine_debug, engine_trace, engine_warn};

const LOG_SOURCE: &str = "galaxy3d::RingBuffer";

fn align_up(value: u64, alignment: u64) -> Option<u64> {
    match value % alignment {
        0 => Some(value),
        rem => value.checked_add(alignment - rem),
    }
}

/// Fixed-length cycle of slots for one named stream
pub struct RingBuffer {
    label: String,
    config: RingBufferConfig,
    slots: Vec<Slot>,
    current: usize,
    generation: u64,
    retired: Arena<RetiredBuffers>,
    stats: RingBufferStats,
    _not_send: PhantomData<*const ()>,
}

impl RingBuffer {
    /// Create a ring buffer
    ///
    /// # Arguments
    ///
    /// * `device` - Device the slot buffers are created on
    /// * `label` - Debug label, also used for buffer labels ("<label> #<slot>")
    /// * `usage` - Buffer usage of the stream (`MAP_WRITE` is always added)
    /// * `config` - Ring configuration
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` for an invalid configuration, or the
    /// device error when `initial_capacity` buffers cannot be created.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        label: impl Into<String>,
        usage: BufferUsage,
        config: RingBufferConfig,
    ) -> Result<Self> {
        let label = label.into();
        config.validate()?;

        let slots = (0..config.slot_count).map(|_| Slot::new(0)).collect();
        let mut ring = Self {
            retired: Arena::new(RetiredBuffers::new(device, &label, usage)),
            label,
            config,
            slots,
            current: 0,
            generation: 0,
            stats: RingBufferStats::default(),
            _not_send: PhantomData,
        };

        let initial = ring.config.initial_capacity;
        for (index, slot) in ring.slots.iter_mut().enumerate() {
            slot.capacity_hint = initial;
            if initial > 0 {
                let request = BufferRequest { slot: index, min_size: initial, size: initial };
                slot.buffer = Some(ring.retired.acquire(&request)?.buffer);
            }
        }

        engine_debug!(LOG_SOURCE, "Created '{}' ({} slots, {} bytes each)",
            ring.label, ring.slots.len(), initial);
        Ok(ring)
    }

    // ===== UPLOAD =====

    /// Write `bytes` into the current slot
    ///
    /// # Returns
    ///
    /// The written range. It stays valid until this slot becomes current
    /// again or the ring is cleared.
    ///
    /// # Errors
    ///
    /// `Error::OutOfMemory` (or the backend error) when a replacement buffer
    /// cannot be created. Treat it as fatal.
    pub fn upload(&mut self, bytes: &[u8]) -> Result<BufferSlice> {
        self.upload_aligned(bytes, 1)
    }

    /// Write `bytes` at the next offset that is a multiple of `alignment`
    ///
    /// Vertex streams align to the vertex stride so that `offset / stride`
    /// is an exact base vertex.
    pub fn upload_aligned(&mut self, bytes: &[u8], alignment: u64) -> Result<BufferSlice> {
        let alignment = alignment.max(1);
        let length = bytes.len() as u64;
        let index = self.current;

        let has_buffer = self.slots[index].buffer.is_some();
        let aligned = align_up(self.slots[index].write_cursor, alignment);
        let end = aligned.and_then(|start| start.checked_add(length));
        let offset = match (aligned, end) {
            (Some(start), Some(end)) if has_buffer && end <= self.slots[index].capacity() => start,
            _ => {
                let requested = end.unwrap_or(length).max(length);
                self.replace_buffer(index, requested)?;
                0
            }
        };

        let slot = &mut self.slots[index];
        let buffer = match &slot.buffer {
            Some(buffer) => Arc::clone(buffer),
            None => return Err(Error::InvalidState(format!("'{}' slot {} has no buffer", self.label, index))),
        };
        if length > 0 {
            buffer.write(offset, bytes)?;
        }
        slot.write_cursor = offset + length;
        slot.written = true;

        self.stats.uploads += 1;
        self.stats.bytes_uploaded += length;
        engine_trace!(LOG_SOURCE, "'{}' slot {}: {} bytes at offset {}", self.label, index, length, offset);

        Ok(BufferSlice {
            buffer,
            offset,
            length,
            slot: index,
            generation: slot.generation,
        })
    }

    /// Write a slice of plain-old-data values
    ///
    /// The offset is aligned to `size_of::<T>()`, so `offset / size_of::<T>()`
    /// is the index of the first element.
    pub fn upload_pod<T: Pod>(&mut self, data: &[T]) -> Result<BufferSlice> {
        self.upload_aligned(bytemuck::cast_slice(data), size_of::<T>() as u64)
    }

    /// Give slot `index` a buffer of at least `requested` bytes, retiring the old one
    ///
    /// A slot that still holds a buffer always grows: only a retired buffer
    /// of at least the grow policy's target is reused. A slot without a
    /// buffer gets its previous capacity back when that is enough.
    fn replace_buffer(&mut self, index: usize, requested: u64) -> Result<()> {
        let slot = &mut self.slots[index];
        let old = slot.buffer.take();
        let current = old.as_ref().map_or(slot.capacity_hint, |buffer| buffer.size());
        let size = if old.is_none() && slot.capacity_hint > 0 && slot.capacity_hint >= requested {
            slot.capacity_hint
        } else {
            self.config.grow_policy.next_capacity(current, requested)
        };

        if let Some(old) = old {
            // Draws recorded this cycle may still bind the old buffer
            self.retired.release(RetiredBuffer::new(old, slot.fence.take(), slot.written));
            self.stats.buffer_replacements += 1;
        }

        let created_before = self.retired.created_count();
        let request = BufferRequest { slot: index, min_size: size, size };
        let buffer = self.retired.acquire(&request)?.buffer;
        let reused = self.retired.created_count() == created_before;

        engine_debug!(LOG_SOURCE, "'{}' slot {} {} buffer of {} bytes (was {} bytes)",
            self.label, index, if reused { "reused a retired" } else { "allocated a" }, buffer.size(), current);

        slot.capacity_hint = buffer.size();
        slot.buffer = Some(buffer);
        slot.write_cursor = 0;
        Ok(())
    }

    // ===== ROTATION =====

    /// Advance to the next slot and reset its write cursor
    ///
    /// Call once per submission cycle, never between uploads of one draw.
    /// When the slot's fence has not signaled, waits at most `reuse_timeout`
    /// and then applies `reuse_fallback`.
    ///
    /// # Errors
    ///
    /// `Error::DeviceLost` (or backend error) if the fence cannot be queried.
    pub fn rotate(&mut self) -> Result<()> {
        self.current = (self.current + 1) % self.slots.len();
        self.generation += 1;
        self.stats.rotations += 1;

        for retired in self.retired.iter_mut() {
            retired.awaiting_submission = false;
        }

        let slot = &mut self.slots[self.current];
        slot.generation = self.generation;
        slot.write_cursor = 0;
        slot.written = false;

        self.reclaim_current()
    }

    /// Wait, unbounded, for the current slot's fence, then `rotate()`
    ///
    /// Reserved for explicit synchronization points (teardown, flush).
    pub fn await_and_rotate(&mut self) -> Result<()> {
        let index = self.current;
        if let Some(fence) = self.slots[index].fence.take() {
            self.wait_unbounded(&fence)?;
        }
        self.rotate()
    }

    /// Make the new current slot safe to write
    fn reclaim_current(&mut self) -> Result<()> {
        let index = self.current;
        let Some(fence) = self.slots[index].fence.clone() else {
            return Ok(());
        };
        let timeout = self.config.reuse_timeout;
        if fence.is_signaled() || fence.wait(FenceWait::from(timeout))? {
            self.slots[index].fence = None;
            return Ok(());
        }

        self.stats.reuse_timeouts += 1;
        let fallback = self.config.reuse_fallback;
        match fallback {
            ReuseFallback::Block => {
                engine_warn!(LOG_SOURCE, "'{}' slot {} still in use after {:?}, blocking", self.label, index, timeout);
                self.wait_unbounded(&fence)?;
                self.slots[index].fence = None;
            }
            ReuseFallback::Reallocate => {
                engine_debug!(LOG_SOURCE, "'{}' slot {} still in use after {:?}, retiring its buffer",
                    self.label, index, timeout);
                let slot = &mut self.slots[index];
                let fence = slot.fence.take();
                if let Some(buffer) = slot.buffer.take() {
                    self.retired.release(RetiredBuffer::new(buffer, fence, false));
                    self.stats.buffer_replacements += 1;
                }
            }
        }
        Ok(())
    }

    fn wait_unbounded(&mut self, fence: &Arc<dyn Fence>) -> Result<()> {
        if fence.is_signaled() {
            return Ok(());
        }
        self.stats.blocking_waits += 1;
        if fence.wait(FenceWait::Indefinite)? {
            Ok(())
        } else {
            Err(Error::DeviceLost(format!("'{}': unbounded fence wait returned early", self.label)))
        }
    }

    // ===== SUBMISSION =====

    /// Attach the fence of a submission that read this cycle's uploads
    ///
    /// A later call in the same cycle replaces the slot's fence: submissions
    /// on one queue complete in order. Buffers retired during this cycle
    /// also keep the fence.
    pub fn mark_submitted(&mut self, fence: &Arc<dyn Fence>) {
        let slot = &mut self.slots[self.current];
        if slot.written {
            slot.fence = Some(Arc::clone(fence));
        }
        for retired in self.retired.iter_mut().filter(|retired| retired.awaiting_submission) {
            retired.attach_fence(fence);
        }
    }

    // ===== RELEASE =====

    /// Release retired buffers whose fences have all signaled
    ///
    /// Call once per frame (e.g. at end of frame). Returns how many buffers
    /// were released.
    pub fn collect_retired(&mut self) -> usize {
        let released = self.retired.evict(RetiredBuffer::is_idle);
        if released > 0 {
            self.stats.retired_released += released as u64;
            engine_debug!(LOG_SOURCE, "'{}' released {} retired buffer(s), {} pending",
                self.label, released, self.retired.len_free());
        }
        released
    }

    /// Whether every fence of every slot and retired buffer has signaled
    ///
    /// Non-blocking: each fence is polled once.
    pub fn is_safe_for_close(&self) -> bool {
        self.slots.iter().all(|slot| !slot.is_in_flight())
            && self.retired.iter().all(|retired| retired.fences.iter().all(|fence| fence.is_signaled()))
    }

    /// `await_and_rotate()` once per slot, then wait for the retired buffers
    ///
    /// Afterwards `is_safe_for_close()` holds and `clear()` may run.
    pub fn drain(&mut self) -> Result<()> {
        for _ in 0..self.slots.len() {
            self.await_and_rotate()?;
        }
        let pending: Vec<Arc<dyn Fence>> = self
            .retired
            .iter()
            .flat_map(|retired| retired.fences.iter().cloned())
            .collect();
        for fence in &pending {
            self.wait_unbounded(fence)?;
        }
        Ok(())
    }

    /// Destroy every slot and retired buffer
    ///
    /// Precondition: `is_safe_for_close()`, or `drain()` was called. Calling
    /// it again is a no-op.
    pub fn clear(&mut self) {
        debug_assert!(
            self.is_safe_for_close(),
            "RingBuffer '{}' cleared while the device may still read it",
            self.label
        );
        if self.is_empty() {
            return;
        }

        self.generation += 1;
        for slot in &mut self.slots {
            slot.buffer = None;
            slot.fence = None;
            slot.write_cursor = 0;
            slot.written = false;
            slot.generation = self.generation;
            slot.capacity_hint = self.config.initial_capacity;
        }
        let released = self.retired.clear();
        self.stats.retired_released += released as u64;

        engine_debug!(LOG_SOURCE, "Cleared '{}'", self.label);
    }

    // ===== QUERIES =====

    /// Whether `slice` is still valid (its slot has not become current again)
    pub fn is_slice_live(&self, slice: &BufferSlice) -> bool {
        self.slots
            .get(slice.slot)
            .is_some_and(|slot| slot.generation == slice.generation && slot.buffer.is_some())
    }

    /// Whether no slot holds a buffer and nothing is retired
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.buffer.is_none()) && self.retired.is_empty()
    }

    /// Debug label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Buffer usage of the slot buffers (includes `MAP_WRITE`)
    pub fn usage(&self) -> BufferUsage {
        self.retired.strategy().usage()
    }

    /// Configuration the ring was built with
    pub fn config(&self) -> &RingBufferConfig {
        &self.config
    }

    /// Number of slots
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Index of the current slot
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Current slot
    pub fn current_slot(&self) -> &Slot {
        &self.slots[self.current]
    }

    /// Slot at `index`
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Capacity of the current slot's buffer
    pub fn capacity(&self) -> u64 {
        self.current_slot().capacity()
    }

    /// Write cursor of the current slot
    pub fn write_cursor(&self) -> u64 {
        self.current_slot().write_cursor()
    }

    /// Retired buffers not yet released
    pub fn retired_count(&self) -> usize {
        self.retired.len_free()
    }

    /// Counters since creation
    pub fn stats(&self) -> RingBufferStats {
        RingBufferStats {
            buffer_allocations: self.retired.created_count() as u64,
            retired_pending: self.retired.len_free() as u64,
            ..self.stats
        }
    }
}

impl Drop for RingBuffer {
    fn drop(&mut self) {
        if !self.is_empty() && !self.is_safe_for_close() {
            engine_warn!(LOG_SOURCE, "'{}' dropped while the device may still read it", self.label);
        }
    }
}

#[cfg(test)]
#[path = "ring_buffer_tests.rs"]
mod tests;
