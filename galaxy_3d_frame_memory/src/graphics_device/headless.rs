/// Headless graphics device (no GPU required)
///
/// Buffers live in CPU memory, fences are signaled either at submit time or
/// explicitly by the caller, and submitted draws are recorded so they can be
/// inspected. Used by tests and by tools that run the frame loop offscreen.
///
/// A blocking (`FenceWait::Indefinite`) wait on an unsignaled fence completes
/// the submission and signals it, the way real hardware eventually would.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, DrawPass, Fence, FenceWait, GraphicsDevice, IndexType,
};
use crate::{engine_bail, engine_bail_warn, engine_debug};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Configuration
// ============================================================================

/// Headless device configuration
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Maximum bytes of live buffers; `None` = unlimited
    pub memory_budget: Option<u64>,
    /// Signal every fence as soon as it is created (an "instant" device)
    pub signal_on_submit: bool,
}

/// Shared counters, also referenced by buffers and fences
#[derive(Debug, Default)]
struct Counters {
    live_buffers: AtomicUsize,
    live_bytes: AtomicU64,
    created_buffers: AtomicUsize,
    created_fences: AtomicUsize,
    blocking_waits: AtomicUsize,
    timed_out_waits: AtomicUsize,
}

// ============================================================================
// Headless Buffer
// ============================================================================

/// CPU-memory buffer
#[derive(Debug)]
pub struct HeadlessBuffer {
    id: u64,
    label: String,
    usage: BufferUsage,
    data: Mutex<Vec<u8>>,
    counters: Arc<Counters>,
}

impl HeadlessBuffer {
    /// Device-unique buffer id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Label given at creation
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Copy `len` bytes starting at `offset`
    pub fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let data = lock(&self.data);
        let start = offset as usize;
        let end = start.checked_add(len as usize).filter(|end| *end <= data.len());
        match end {
            Some(end) => Ok(data[start..end].to_vec()),
            None => Err(Error::InvalidResource(format!(
                "read of {} bytes at offset {} out of range for '{}' ({} bytes)",
                len, offset, self.label, data.len()
            ))),
        }
    }
}

impl Buffer for HeadlessBuffer {
    fn size(&self) -> u64 {
        lock(&self.data).len() as u64
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        if !self.usage.contains(BufferUsage::MAP_WRITE) {
            return Err(Error::InvalidResource(format!("buffer '{}' is not CPU-writable", self.label)));
        }
        let mut storage = lock(&self.data);
        let start = offset as usize;
        let end = start.checked_add(data.len()).filter(|end| *end <= storage.len());
        match end {
            Some(end) => {
                storage[start..end].copy_from_slice(data);
                Ok(())
            }
            None => Err(Error::InvalidResource(format!(
                "write of {} bytes at offset {} out of range for '{}' ({} bytes)",
                data.len(), offset, self.label, storage.len()
            ))),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for HeadlessBuffer {
    fn drop(&mut self) {
        let size = self.data.get_mut().map(|data| data.len()).unwrap_or(0) as u64;
        self.counters.live_buffers.fetch_sub(1, Ordering::Relaxed);
        self.counters.live_bytes.fetch_sub(size, Ordering::Relaxed);
    }
}

// ============================================================================
// Headless Fence
// ============================================================================

/// Fence signaled by the caller (or by a blocking wait)
#[derive(Debug)]
pub struct HeadlessFence {
    id: u64,
    signaled: AtomicBool,
    counters: Arc<Counters>,
}

impl HeadlessFence {
    /// Device-unique fence id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Mark the submission as finished
    pub fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }
}

impl Fence for HeadlessFence {
    fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }

    fn wait(&self, wait: FenceWait) -> Result<bool> {
        if self.is_signaled() {
            return Ok(true);
        }
        match wait {
            FenceWait::Indefinite => {
                self.counters.blocking_waits.fetch_add(1, Ordering::Relaxed);
                self.signal();
                Ok(true)
            }
            FenceWait::Poll | FenceWait::Timeout(_) => {
                self.counters.timed_out_waits.fetch_add(1, Ordering::Relaxed);
                Ok(false)
            }
        }
    }
}

// ============================================================================
// Headless DrawPass
// ============================================================================

/// A recorded command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    /// Vertex buffer bound at binding 0
    BindVertexBuffer { buffer: u64, offset: u64 },
    /// Index buffer bound
    BindIndexBuffer { buffer: u64, offset: u64, index_type: IndexType },
    /// Indexed draw issued
    DrawIndexed { index_count: u32, first_index: u32, base_vertex: i32, instance_count: u32 },
}

/// Pass that records commands into a list
#[derive(Debug, Default)]
pub struct HeadlessDrawPass {
    label: String,
    commands: Vec<DrawCommand>,
}

impl HeadlessDrawPass {
    /// Create an empty pass
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            commands: Vec::new(),
        }
    }

    /// Commands recorded so far
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    fn buffer_id(buffer: &Arc<dyn Buffer>) -> Result<u64> {
        buffer
            .as_any()
            .downcast_ref::<HeadlessBuffer>()
            .map(HeadlessBuffer::id)
            .ok_or_else(|| Error::InvalidResource("buffer was not created by a HeadlessDevice".to_string()))
    }
}

impl DrawPass for HeadlessDrawPass {
    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        let buffer = Self::buffer_id(buffer)?;
        self.commands.push(DrawCommand::BindVertexBuffer { buffer, offset });
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()> {
        let buffer = Self::buffer_id(buffer)?;
        self.commands.push(DrawCommand::BindIndexBuffer { buffer, offset, index_type });
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, base_vertex: i32, instance_count: u32) -> Result<()> {
        self.commands.push(DrawCommand::DrawIndexed { index_count, first_index, base_vertex, instance_count });
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Headless Device
// ============================================================================

/// Headless device
#[derive(Debug)]
pub struct HeadlessDevice {
    config: HeadlessConfig,
    counters: Arc<Counters>,
    next_id: AtomicU64,
    fences: Mutex<Vec<Weak<HeadlessFence>>>,
    submitted: Mutex<Vec<DrawCommand>>,
}

impl HeadlessDevice {
    /// Create a headless device
    pub fn new(config: HeadlessConfig) -> Self {
        Self {
            config,
            counters: Arc::new(Counters::default()),
            next_id: AtomicU64::new(1),
            fences: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Read back buffer contents
    ///
    /// # Errors
    ///
    /// `InvalidResource` if the buffer was not created by a headless device
    /// or the range is out of bounds.
    pub fn read_buffer(&self, buffer: &dyn Buffer, offset: u64, len: u64) -> Result<Vec<u8>> {
        match buffer.as_any().downcast_ref::<HeadlessBuffer>() {
            Some(headless) => headless.read(offset, len),
            None => Err(Error::InvalidResource("buffer was not created by a HeadlessDevice".to_string())),
        }
    }

    /// Signal every outstanding fence
    pub fn signal_all(&self) {
        let mut fences = lock(&self.fences);
        for fence in fences.iter().filter_map(Weak::upgrade) {
            fence.signal();
        }
        fences.retain(|fence| fence.strong_count() > 0);
    }

    /// Number of fences still alive and unsignaled
    pub fn pending_fence_count(&self) -> usize {
        lock(&self.fences)
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|fence| !fence.is_signaled())
            .count()
    }

    /// Every command submitted so far, in submission order
    pub fn submitted_commands(&self) -> Vec<DrawCommand> {
        lock(&self.submitted).clone()
    }

    /// Buffers currently alive
    pub fn live_buffer_count(&self) -> usize {
        self.counters.live_buffers.load(Ordering::Relaxed)
    }

    /// Bytes held by live buffers
    pub fn live_bytes(&self) -> u64 {
        self.counters.live_bytes.load(Ordering::Relaxed)
    }

    /// Buffers created since the device started
    pub fn created_buffer_count(&self) -> usize {
        self.counters.created_buffers.load(Ordering::Relaxed)
    }

    /// Fences created since the device started
    pub fn created_fence_count(&self) -> usize {
        self.counters.created_fences.load(Ordering::Relaxed)
    }

    /// Unbounded waits that had to complete an unsignaled fence
    pub fn blocking_wait_count(&self) -> usize {
        self.counters.blocking_waits.load(Ordering::Relaxed)
    }

    /// Bounded waits that returned false
    pub fn timed_out_wait_count(&self) -> usize {
        self.counters.timed_out_waits.load(Ordering::Relaxed)
    }

    /// Submit a headless pass and keep the concrete fence handle
    ///
    /// The recorded commands move to the device log; the pass is left empty
    /// and can be recorded again.
    pub fn submit_pass(&self, pass: &mut HeadlessDrawPass) -> Arc<HeadlessFence> {
        let commands = std::mem::take(&mut pass.commands);
        lock(&self.submitted).extend(commands);

        self.counters.created_fences.fetch_add(1, Ordering::Relaxed);
        let fence = Arc::new(HeadlessFence {
            id: self.next_id(),
            signaled: AtomicBool::new(self.config.signal_on_submit),
            counters: Arc::clone(&self.counters),
        });

        let mut fences = lock(&self.fences);
        fences.retain(|fence| fence.strong_count() > 0);
        fences.push(Arc::downgrade(&fence));

        crate::engine_trace!("galaxy3d::headless", "Submitted pass '{}' (fence {})", pass.label, fence.id);
        fence
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(HeadlessConfig::default())
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn name(&self) -> &str {
        "headless"
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        if desc.size == 0 {
            engine_bail_warn!("galaxy3d::headless", "Buffer '{}' requested with size 0", desc.label);
        }
        if let Some(budget) = self.config.memory_budget {
            let live = self.live_bytes();
            if live.saturating_add(desc.size) > budget {
                crate::engine_error!("galaxy3d::headless",
                    "Out of memory for '{}' ({} bytes requested, {} of {} in use)",
                    desc.label, desc.size, live, budget);
                return Err(Error::OutOfMemory);
            }
        }

        self.counters.live_buffers.fetch_add(1, Ordering::Relaxed);
        self.counters.live_bytes.fetch_add(desc.size, Ordering::Relaxed);
        self.counters.created_buffers.fetch_add(1, Ordering::Relaxed);

        let buffer = HeadlessBuffer {
            id: self.next_id(),
            label: desc.label.clone(),
            usage: desc.usage,
            data: Mutex::new(vec![0u8; desc.size as usize]),
            counters: Arc::clone(&self.counters),
        };
        engine_debug!("galaxy3d::headless", "Created {} buffer '{}' ({} bytes, id {})",
            desc.usage.kind_name(), desc.label, desc.size, buffer.id);
        Ok(Arc::new(buffer))
    }

    fn submit(&self, pass: &mut dyn DrawPass) -> Result<Arc<dyn Fence>> {
        match pass.as_any_mut().downcast_mut::<HeadlessDrawPass>() {
            Some(pass) => Ok(self.submit_pass(pass)),
            None => engine_bail!("galaxy3d::headless", "submit: pass was not created for a HeadlessDevice"),
        }
    }
}

#[cfg(test)]
#[path = "headless_tests.rs"]
mod tests;
