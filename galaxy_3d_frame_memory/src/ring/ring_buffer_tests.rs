/// Unit tests for RingBuffer, driven by the headless device

use super::*;
use crate::graphics_device::{HeadlessBuffer, HeadlessConfig, HeadlessDevice, HeadlessDrawPass, HeadlessFence};
use crate::ring::{GrowPolicy, SlotState};

// ============================================================================
// Helpers
// ============================================================================

fn config(slot_count: usize, initial_capacity: u64, reuse_fallback: ReuseFallback) -> RingBufferConfig {
    RingBufferConfig {
        slot_count,
        initial_capacity,
        reuse_fallback,
        ..Default::default()
    }
}

fn ring(device: &Arc<HeadlessDevice>, config: RingBufferConfig) -> RingBuffer {
    RingBuffer::new(device.clone(), "test VBO", BufferUsage::VERTEX, config).unwrap()
}

/// Submit an empty pass and attach its fence to the ring
fn submit(device: &HeadlessDevice, ring: &mut RingBuffer) -> Arc<HeadlessFence> {
    let fence = device.submit_pass(&mut HeadlessDrawPass::new("frame"));
    let dyn_fence: Arc<dyn Fence> = fence.clone();
    ring.mark_submitted(&dyn_fence);
    fence
}

fn read(device: &HeadlessDevice, slice: &BufferSlice) -> Vec<u8> {
    device.read_buffer(slice.buffer().as_ref(), slice.offset(), slice.length()).unwrap()
}

fn buffer_id(slice: &BufferSlice) -> u64 {
    slice.buffer().as_any().downcast_ref::<HeadlessBuffer>().map(HeadlessBuffer::id).unwrap()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_new_rejects_zero_slots() {
    let device: Arc<dyn GraphicsDevice> = Arc::new(HeadlessDevice::default());
    let result = RingBuffer::new(device, "bad", BufferUsage::VERTEX, config(0, 0, ReuseFallback::Block));
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
fn test_initial_capacity_allocates_every_slot() {
    let device = Arc::new(HeadlessDevice::default());
    let ring = ring(&device, config(3, 1024, ReuseFallback::Reallocate));

    assert_eq!(device.live_buffer_count(), 3);
    assert_eq!(device.live_bytes(), 3 * 1024);
    assert_eq!(ring.stats().buffer_allocations, 3);
    assert_eq!(ring.capacity(), 1024);
    assert_eq!(ring.usage(), BufferUsage::VERTEX | BufferUsage::MAP_WRITE);
    assert!(ring.is_safe_for_close());
}

#[test]
fn test_lazy_allocation_on_first_upload() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, RingBufferConfig::default());
    assert!(ring.is_empty());
    assert_eq!(device.live_buffer_count(), 0);

    ring.upload(&[1; 10]).unwrap();
    assert_eq!(device.live_buffer_count(), 1);
    assert_eq!(ring.capacity(), 4096);
    assert_eq!(ring.stats().buffer_replacements, 0);
}

// ============================================================================
// Upload
// ============================================================================

#[test]
fn test_upload_round_trip() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 256, ReuseFallback::Block));
    let payload: Vec<u8> = (0..=255).collect();

    let slice = ring.upload(&payload).unwrap();
    assert_eq!(slice.offset(), 0);
    assert_eq!(slice.length(), 256);
    assert_eq!(read(&device, &slice), payload);
}

#[test]
fn test_uploads_append_within_a_cycle() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 1024, ReuseFallback::Block));

    let a = ring.upload(&[1; 100]).unwrap();
    let b = ring.upload(&[2; 50]).unwrap();
    assert_eq!((a.offset(), a.length()), (0, 100));
    assert_eq!((b.offset(), b.length()), (100, 50));
    assert_eq!(b.end(), 150);
    assert_eq!(ring.write_cursor(), 150);
    assert_eq!(read(&device, &a), vec![1; 100]);
    assert_eq!(read(&device, &b), vec![2; 50]);
}

#[test]
fn test_upload_aligned_rounds_offset_to_stride() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(1, 1024, ReuseFallback::Block));
    ring.upload(&[0; 10]).unwrap();

    let slice = ring.upload_aligned(&[7; 48], 24).unwrap();
    assert_eq!(slice.offset(), 24);
    assert_eq!(slice.offset() % 24, 0);
}

#[test]
fn test_upload_pod_aligns_to_element_size() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(1, 1024, ReuseFallback::Block));
    ring.upload(&[0; 3]).unwrap();

    let slice = ring.upload_pod(&[1u32, 2, 3]).unwrap();
    assert_eq!(slice.offset(), 4);
    assert_eq!(slice.length(), 12);
    assert_eq!(read(&device, &slice), bytemuck::cast_slice::<u32, u8>(&[1, 2, 3]).to_vec());
}

#[test]
fn test_empty_upload() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, RingBufferConfig::default());
    let slice = ring.upload(&[]).unwrap();
    assert!(slice.is_empty());
    assert_eq!(slice.offset(), 0);
    assert_eq!(ring.capacity(), 4096);
}

#[test]
fn test_empty_upload_on_lazy_ring_allocates_policy_minimum() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, RingBufferConfig {
        grow_policy: GrowPolicy::Exact,
        ..config(2, 0, ReuseFallback::Block)
    });

    let slice = ring.upload(&[]).unwrap();
    assert!(slice.is_empty());
    assert_eq!(ring.capacity(), 1);
    assert_eq!(device.live_buffer_count(), 1);
    assert_eq!(ring.stats().buffer_replacements, 0);

    // The next upload grows the slot as usual
    let slice = ring.upload(&[5; 8]).unwrap();
    assert_eq!((slice.offset(), slice.length()), (0, 8));
    assert_eq!(ring.capacity(), 8);
}

#[test]
fn test_out_of_memory_is_propagated() {
    let device = Arc::new(HeadlessDevice::new(HeadlessConfig {
        memory_budget: Some(2048),
        ..Default::default()
    }));
    let mut ring = ring(&device, config(2, 1024, ReuseFallback::Block));
    let result = ring.upload(&vec![0; 4000]);
    assert!(matches!(result, Err(Error::OutOfMemory)));
}

// ============================================================================
// Growth
// ============================================================================

#[test]
fn test_growth_replaces_once_then_fits() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, RingBufferConfig {
        grow_policy: GrowPolicy::Exact,
        ..config(2, 1024, ReuseFallback::Block)
    });

    ring.upload(&[1; 1000]).unwrap();
    let grown = ring.upload(&[2; 500]).unwrap();
    assert_eq!(ring.stats().buffer_replacements, 1);
    assert!(ring.capacity() >= 500);
    assert_eq!(ring.capacity(), 1500);
    assert_eq!((grown.offset(), grown.length()), (0, 500));

    ring.upload(&[3; 1000]).unwrap();
    assert_eq!(ring.stats().buffer_replacements, 1);
    assert_eq!(ring.write_cursor(), 1500);
}

#[test]
fn test_oversized_upload_on_idle_slot() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 1024, ReuseFallback::Block));

    let slice = ring.upload(&vec![9; 10_000]).unwrap();
    assert_eq!(slice.offset(), 0);
    assert!(ring.capacity() >= 10_000);
    assert_eq!(ring.stats().buffer_replacements, 1);
    assert_eq!(read(&device, &slice), vec![9; 10_000]);
}

#[test]
fn test_slices_from_replaced_buffer_stay_readable() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 64, ReuseFallback::Block));

    let before = ring.upload(&[5; 60]).unwrap();
    let after = ring.upload(&[6; 60]).unwrap();
    assert_ne!(buffer_id(&before), buffer_id(&after));
    assert!(ring.is_slice_live(&before));
    assert_eq!(read(&device, &before), vec![5; 60]);
    assert_eq!(ring.retired_count(), 1);
}

#[test]
fn test_growth_keeps_retired_until_submission_signals() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 64, ReuseFallback::Block));

    ring.upload(&[1; 60]).unwrap();
    ring.upload(&[2; 60]).unwrap();
    // Draws of this cycle may still bind the retired buffer
    assert_eq!(ring.collect_retired(), 0);

    let fence = submit(&device, &mut ring);
    ring.rotate().unwrap();
    assert_eq!(ring.collect_retired(), 0);
    assert!(!ring.is_safe_for_close());

    fence.signal();
    assert_eq!(ring.collect_retired(), 1);
    assert_eq!(ring.stats().retired_released, 1);
    assert_eq!(ring.stats().retired_pending, 0);
}

#[test]
fn test_growth_never_reuses_a_retired_buffer_below_target() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, RingBufferConfig {
        grow_policy: GrowPolicy::Exact,
        ..config(2, 1024, ReuseFallback::Block)
    });

    for frame in 0..4 {
        ring.rotate().unwrap();
        let before = ring.capacity();
        ring.upload(&[1; 1000]).unwrap();
        let tail = ring.upload(&[2; 100]).unwrap();
        if frame < 2 {
            // The idle 1024-byte buffer retired by the other slot is too small
            assert_eq!(before, 1024);
            assert_eq!(ring.capacity(), 1100);
            assert_eq!(tail.offset(), 0);
        } else {
            assert_eq!(tail.offset(), 1000);
        }
        submit(&device, &mut ring).signal();
    }

    assert_eq!(ring.stats().buffer_replacements, 2);
    assert_eq!(ring.stats().buffer_allocations, 4);
    for index in 0..2 {
        assert_eq!(ring.slot(index).unwrap().capacity(), 1100);
    }
}

// ============================================================================
// Rotation
// ============================================================================

#[test]
fn test_rotation_is_cyclic() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(3, 0, ReuseFallback::Block));
    let start = ring.current_index();

    for _ in 0..3 {
        ring.rotate().unwrap();
    }
    assert_eq!(ring.current_index(), start);

    ring.rotate().unwrap();
    assert_eq!(ring.current_index(), (start + 1) % 3);
    assert_eq!(ring.stats().rotations, 4);
}

#[test]
fn test_rotate_resets_cursor_of_new_slot() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(1, 1024, ReuseFallback::Block));
    ring.upload(&[1; 300]).unwrap();
    ring.rotate().unwrap();
    assert_eq!(ring.write_cursor(), 0);
    assert_eq!(ring.upload(&[2; 10]).unwrap().offset(), 0);
}

#[test]
fn test_rotate_onto_signaled_slot_does_not_wait() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(1, 1024, ReuseFallback::Block));
    ring.upload(&[1; 16]).unwrap();
    let fence = submit(&device, &mut ring);
    assert_eq!(ring.current_slot().state(), SlotState::Submitted);

    fence.signal();
    assert_eq!(ring.current_slot().state(), SlotState::Signaled);
    ring.rotate().unwrap();

    assert_eq!(ring.current_slot().state(), SlotState::Idle);
    assert_eq!(ring.stats().reuse_timeouts, 0);
    assert_eq!(device.timed_out_wait_count(), 0);
}

#[test]
fn test_rotate_timeout_with_block_fallback_waits() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(1, 1024, ReuseFallback::Block));
    ring.upload(&[1; 16]).unwrap();
    let fence = submit(&device, &mut ring);

    ring.rotate().unwrap();
    assert!(fence.is_signaled());
    assert_eq!(ring.stats().reuse_timeouts, 1);
    assert_eq!(ring.stats().blocking_waits, 1);
    assert_eq!(device.blocking_wait_count(), 1);
    assert_eq!(ring.capacity(), 1024);
}

#[test]
fn test_rotate_timeout_with_reallocate_fallback_retires() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(1, 1024, ReuseFallback::Reallocate));
    ring.upload(&[1; 16]).unwrap();
    let fence = submit(&device, &mut ring);

    ring.rotate().unwrap();
    assert!(!fence.is_signaled());
    assert_eq!(ring.stats().reuse_timeouts, 1);
    assert_eq!(ring.stats().blocking_waits, 0);
    assert!(ring.current_slot().buffer().is_none());
    assert_eq!(ring.retired_count(), 1);
    assert!(!ring.is_safe_for_close());

    // The slot gets a fresh buffer of the same size
    let slice = ring.upload(&[2; 16]).unwrap();
    assert_eq!(slice.offset(), 0);
    assert_eq!(ring.capacity(), 1024);
    assert_eq!(ring.stats().buffer_allocations, 2);

    fence.signal();
    assert_eq!(ring.collect_retired(), 1);
    assert!(ring.is_safe_for_close());
}

#[test]
fn test_reallocate_reuses_signaled_retired_buffer() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(1, 1024, ReuseFallback::Reallocate));
    let first = ring.upload(&[1; 16]).unwrap();
    let fence = submit(&device, &mut ring);
    ring.rotate().unwrap();

    fence.signal();
    let second = ring.upload(&[2; 16]).unwrap();
    assert_eq!(buffer_id(&first), buffer_id(&second));
    assert_eq!(ring.stats().buffer_allocations, 1);
    assert_eq!(ring.retired_count(), 0);
}

#[test]
fn test_await_and_rotate_waits_on_current_slot() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 1024, ReuseFallback::Block));
    ring.upload(&[1; 16]).unwrap();
    let fence = submit(&device, &mut ring);

    ring.await_and_rotate().unwrap();
    assert!(fence.is_signaled());
    assert_eq!(ring.current_index(), 1);
    assert_eq!(ring.stats().blocking_waits, 1);
    assert_eq!(ring.stats().reuse_timeouts, 0);
}

#[test]
fn test_scenario_two_slots_1024_bytes() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 1024, ReuseFallback::Block));

    let first = ring.upload(&[0xAA; 500]).unwrap();
    assert_eq!((first.offset(), first.length()), (0, 500));
    let first_fence = submit(&device, &mut ring);

    ring.rotate().unwrap();
    let second = ring.upload(&[0xBB; 500]).unwrap();
    assert_eq!((second.offset(), second.length()), (0, 500));
    assert_eq!(second.slot_index(), 1);
    submit(&device, &mut ring);

    // Back to the first slot, whose submission is still in flight
    assert!(!first_fence.is_signaled());
    ring.await_and_rotate().unwrap();
    assert!(first_fence.is_signaled());
    assert_eq!(ring.current_index(), 0);
    assert_eq!(ring.write_cursor(), 0);

    let third = ring.upload(&[0xCC; 200]).unwrap();
    assert_eq!((third.offset(), third.length()), (0, 200));
    assert_eq!(buffer_id(&third), buffer_id(&first));
    assert_eq!(read(&device, &third), vec![0xCC; 200]);
    assert!(!ring.is_slice_live(&first));
}

// ============================================================================
// Submission fences
// ============================================================================

#[test]
fn test_mark_submitted_ignores_unwritten_slot() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 1024, ReuseFallback::Block));
    submit(&device, &mut ring);
    assert_eq!(ring.current_slot().state(), SlotState::Idle);
    assert!(ring.is_safe_for_close());
}

#[test]
fn test_mark_submitted_keeps_latest_fence() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 1024, ReuseFallback::Block));
    ring.upload(&[1; 8]).unwrap();
    let early = submit(&device, &mut ring);
    ring.upload(&[2; 8]).unwrap();
    let late = submit(&device, &mut ring);

    early.signal();
    assert!(!ring.is_safe_for_close());
    late.signal();
    assert!(ring.is_safe_for_close());
}

// ============================================================================
// Safety gating and teardown
// ============================================================================

#[test]
fn test_safety_gating() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(3, 256, ReuseFallback::Block));
    assert!(ring.is_safe_for_close());

    let mut fences = Vec::new();
    for _ in 0..3 {
        ring.upload(&[1; 32]).unwrap();
        fences.push(submit(&device, &mut ring));
        ring.rotate().unwrap();
    }
    // Rotating onto slot 0 blocked on its fence; slots 1 and 2 are still in flight
    assert!(!ring.is_safe_for_close());

    fences[1].signal();
    assert!(!ring.is_safe_for_close());
    fences[2].signal();
    assert!(ring.is_safe_for_close());
}

#[test]
fn test_clear_is_idempotent() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 512, ReuseFallback::Block));
    ring.upload(&[1; 500]).unwrap();
    ring.upload(&[2; 500]).unwrap();
    assert_eq!(device.live_buffer_count(), 3);

    ring.clear();
    assert!(ring.is_empty());
    assert_eq!(device.live_buffer_count(), 0);
    let stats = ring.stats();

    ring.clear();
    assert!(ring.is_empty());
    assert_eq!(ring.stats(), stats);
    assert_eq!(device.live_buffer_count(), 0);
}

#[test]
fn test_clear_invalidates_slices_and_ring_is_reusable() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 512, ReuseFallback::Block));
    let slice = ring.upload(&[1; 10]).unwrap();
    ring.clear();
    assert!(!ring.is_slice_live(&slice));

    let again = ring.upload(&[2; 10]).unwrap();
    assert_eq!(again.offset(), 0);
    assert_eq!(ring.capacity(), 512);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "cleared while the device may still read it")]
fn test_clear_while_in_flight_panics_in_debug() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 512, ReuseFallback::Block));
    ring.upload(&[1; 10]).unwrap();
    let _fence = submit(&device, &mut ring);
    ring.clear();
}

#[test]
fn test_drain_then_clear() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(3, 64, ReuseFallback::Reallocate));
    for _ in 0..3 {
        ring.upload(&[1; 60]).unwrap();
        ring.upload(&[2; 60]).unwrap();
        submit(&device, &mut ring);
        ring.rotate().unwrap();
    }
    assert!(!ring.is_safe_for_close());

    ring.drain().unwrap();
    assert!(ring.is_safe_for_close());
    assert_eq!(device.pending_fence_count(), 0);

    ring.clear();
    assert_eq!(device.live_buffer_count(), 0);
}

// ============================================================================
// Slice liveness
// ============================================================================

#[test]
fn test_slice_stale_after_slot_comes_around() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 256, ReuseFallback::Block));
    let slice = ring.upload(&[1; 8]).unwrap();

    ring.rotate().unwrap();
    assert!(ring.is_slice_live(&slice));
    ring.rotate().unwrap();
    assert!(!ring.is_slice_live(&slice));
}

// ============================================================================
// Stats
// ============================================================================

#[test]
fn test_stats_merge() {
    let mut total = RingBufferStats { uploads: 2, bytes_uploaded: 100, ..Default::default() };
    total.merge(&RingBufferStats { uploads: 3, rotations: 1, retired_pending: 2, ..Default::default() });
    assert_eq!(total.uploads, 5);
    assert_eq!(total.bytes_uploaded, 100);
    assert_eq!(total.rotations, 1);
    assert_eq!(total.retired_pending, 2);
}

#[test]
fn test_stats_count_uploads() {
    let device = Arc::new(HeadlessDevice::default());
    let mut ring = ring(&device, config(2, 256, ReuseFallback::Block));
    ring.upload(&[1; 8]).unwrap();
    ring.upload(&[1; 24]).unwrap();
    let stats = ring.stats();
    assert_eq!(stats.uploads, 2);
    assert_eq!(stats.bytes_uploaded, 32);
}
