//! Integration tests for the frame loop
//!
//! These tests drive FrameMemory the way a renderer does, on the headless
//! device, with fences completed a few frames late to emulate device latency.
//! No GPU required.
//!
//! Run with: cargo test --test frame_loop_integration_tests

use std::collections::VecDeque;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use galaxy_3d_frame_memory::galaxy3d::{
    BufferSlice, DrawCommand, Fence, FrameMemory, FrameMemoryConfig, HeadlessConfig, HeadlessDevice,
    HeadlessDrawPass, HeadlessFence, Mesh, PrimitiveMode, ReuseFallback, RingBufferConfig, VertexFormat,
};

// ============================================================================
// HELPERS
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct Vertex {
    position: Vec3,
    color: [u8; 4],
}

/// `count` unit quads laid out along X, colored by frame
fn quads(count: usize, frame: u8) -> Vec<Vertex> {
    (0..count)
        .flat_map(|i| {
            let x = i as f32;
            [
                Vec3::new(x, 0.0, 0.0),
                Vec3::new(x + 1.0, 0.0, 0.0),
                Vec3::new(x + 1.0, 1.0, 0.0),
                Vec3::new(x, 1.0, 0.0),
            ]
        })
        .map(|position| Vertex { position, color: [frame, 0, 0, 255] })
        .collect()
}

fn read(device: &HeadlessDevice, slice: &BufferSlice) -> Vec<u8> {
    device.read_buffer(slice.buffer().as_ref(), slice.offset(), slice.length()).unwrap()
}

/// Device that completes each submission `latency` frames after it was made
struct LaggingQueue {
    in_flight: VecDeque<Arc<HeadlessFence>>,
    latency: usize,
}

impl LaggingQueue {
    fn new(latency: usize) -> Self {
        Self { in_flight: VecDeque::new(), latency }
    }

    fn push(&mut self, fence: Arc<HeadlessFence>) {
        self.in_flight.push_back(fence);
        while self.in_flight.len() > self.latency {
            if let Some(done) = self.in_flight.pop_front() {
                done.signal();
            }
        }
    }
}

/// Stage, draw and submit one mesh; returns the bytes uploaded and the fence
fn run_frame(
    device: &HeadlessDevice,
    memory: &mut FrameMemory,
    key: galaxy_3d_frame_memory::galaxy3d::SessionKey,
    vertices: &[Vertex],
) -> Arc<HeadlessFence> {
    let mesh = Mesh::from_vertices(vertices, PrimitiveMode::Quads);
    let mut pass = HeadlessDrawPass::new("frame");

    let session = memory.session_mut(key).unwrap();
    session.upload_and_set(&mesh, &VertexFormat::position_color(), true).unwrap();
    assert_eq!(read(device, session.vertex_slice().unwrap()), bytemuck::cast_slice::<Vertex, u8>(vertices));
    session.bind_and_draw(&mut pass).unwrap();

    let fence = device.submit_pass(&mut pass);
    let submitted: Arc<dyn Fence> = fence.clone();
    memory.mark_submitted(&submitted);
    memory.end_frame();
    fence
}

// ============================================================================
// FRAME LOOP TESTS
// ============================================================================

#[test]
fn test_integration_triple_buffering_never_waits_with_two_frames_latency() {
    let device = Arc::new(HeadlessDevice::default());
    let mut memory = FrameMemory::new(device.clone(), FrameMemoryConfig::default()).unwrap();
    let key = memory.create_session("world").unwrap();
    let mut queue = LaggingQueue::new(2);

    for frame in 0..100u8 {
        let vertices = quads(frame as usize % 7 + 1, frame);
        queue.push(run_frame(&device, &mut memory, key, &vertices));
    }

    let stats = memory.stats();
    assert_eq!(stats.reuse_timeouts, 0);
    assert_eq!(stats.blocking_waits, 0);
    assert_eq!(stats.buffer_replacements, 0);
    assert_eq!(stats.uploads, 200);
    assert_eq!(device.blocking_wait_count(), 0);
    assert_eq!(device.submitted_commands().len(), 300);

    memory.shutdown().unwrap();
    assert_eq!(device.live_buffer_count(), 0);
}

#[test]
fn test_integration_growth_settles() {
    let device = Arc::new(HeadlessDevice::new(HeadlessConfig {
        signal_on_submit: true,
        ..Default::default()
    }));
    let mut memory = FrameMemory::new(device.clone(), FrameMemoryConfig::default()).unwrap();
    let key = memory.create_session("particles").unwrap();

    // 64 bytes per quad: 64 B .. 64 KiB
    for shift in 0..11 {
        run_frame(&device, &mut memory, key, &quads(1 << shift, shift as u8));
    }
    // One cycle at the peak so that every slot has grown
    for frame in 0..3 {
        run_frame(&device, &mut memory, key, &quads(1 << 10, frame));
    }
    let grown = memory.stats().buffer_replacements;
    assert!(grown > 0);

    for frame in 0..10 {
        run_frame(&device, &mut memory, key, &quads(1 << 10, frame));
    }
    assert_eq!(memory.stats().buffer_replacements, grown);
    assert_eq!(memory.stats().retired_pending, 0);
}

#[test]
fn test_integration_stalled_device_reallocates() {
    let device = Arc::new(HeadlessDevice::default());
    let config = FrameMemoryConfig {
        vertex: RingBufferConfig { reuse_fallback: ReuseFallback::Reallocate, ..RingBufferConfig::with_slots(2, 1024) },
        index: RingBufferConfig { reuse_fallback: ReuseFallback::Reallocate, ..RingBufferConfig::with_slots(2, 1024) },
        ..Default::default()
    };
    let mut memory = FrameMemory::new(device.clone(), config).unwrap();
    let key = memory.create_session("hud").unwrap();

    let fences: Vec<_> = (0..6u8).map(|frame| run_frame(&device, &mut memory, key, &quads(2, frame))).collect();

    let stats = memory.stats();
    assert!(stats.reuse_timeouts > 0);
    assert_eq!(stats.blocking_waits, 0);
    assert_eq!(device.blocking_wait_count(), 0);
    assert!(stats.retired_pending > 0);
    assert!(!memory.is_safe_for_close());

    for fence in &fences {
        fence.signal();
    }
    memory.end_frame();
    assert_eq!(memory.stats().retired_pending, 0);
    assert!(memory.is_safe_for_close());

    memory.shutdown().unwrap();
    assert_eq!(device.live_buffer_count(), 0);
}

#[test]
fn test_integration_stalled_device_blocks() {
    let device = Arc::new(HeadlessDevice::default());
    let config = FrameMemoryConfig {
        vertex: RingBufferConfig { reuse_fallback: ReuseFallback::Block, ..RingBufferConfig::with_slots(2, 1024) },
        index: RingBufferConfig { reuse_fallback: ReuseFallback::Block, ..RingBufferConfig::with_slots(2, 1024) },
        ..Default::default()
    };
    let mut memory = FrameMemory::new(device.clone(), config).unwrap();
    let key = memory.create_session("hud").unwrap();

    for frame in 0..4u8 {
        run_frame(&device, &mut memory, key, &quads(2, frame));
    }

    // Frames 2 and 3 landed on slots still in flight. Both rings share the
    // frame's fence, so the vertex ring's wait completes it before the
    // index ring rotates.
    let stats = memory.stats();
    assert_eq!(stats.reuse_timeouts, 2);
    assert_eq!(stats.blocking_waits, 2);
    assert_eq!(stats.retired_pending, 0);
    assert_eq!(stats.buffer_allocations, 4);
}

#[test]
fn test_integration_two_meshes_in_one_pass() {
    let device = Arc::new(HeadlessDevice::default());
    let mut memory = FrameMemory::new(device.clone(), FrameMemoryConfig::default()).unwrap();
    let key = memory.create_session("debug").unwrap();
    let format = VertexFormat::position_color();
    let mut pass = HeadlessDrawPass::new("frame");

    let session = memory.session_mut(key).unwrap();
    session.upload_and_set(&Mesh::from_vertices(&quads(3, 0), PrimitiveMode::Quads), &format, true).unwrap();
    session.bind_and_draw(&mut pass).unwrap();
    session.upload_and_set(&Mesh::from_vertices(&quads(1, 1), PrimitiveMode::Quads), &format, false).unwrap();
    session.bind_and_draw(&mut pass).unwrap();

    let draws: Vec<_> = pass
        .commands()
        .iter()
        .filter(|command| matches!(command, DrawCommand::DrawIndexed { .. }))
        .cloned()
        .collect();
    assert_eq!(draws, vec![
        DrawCommand::DrawIndexed { index_count: 18, first_index: 0, base_vertex: 0, instance_count: 1 },
        DrawCommand::DrawIndexed { index_count: 6, first_index: 18, base_vertex: 12, instance_count: 1 },
    ]);

    let fence: Arc<dyn Fence> = device.submit_pass(&mut pass);
    memory.mark_submitted(&fence);
    memory.shutdown().unwrap();
}
