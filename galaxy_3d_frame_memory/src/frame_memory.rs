/// FrameMemory - owner of every upload session and scratch pool of a render thread
///
/// Created once at renderer start-up with the device, passed to whatever
/// records draws, shut down before the device is destroyed. The type is
/// `!Send`: it lives on the render thread that created it.

use std::marker::PhantomData;
use std::sync::Arc;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::graphics_device::{Fence, GraphicsDevice};
use crate::pool::ScratchPools;
use crate::ring::{RingBufferConfig, RingBufferStats};
use crate::upload::UploadSession;
use crate::{engine_debug, engine_info, engine_warn};

const LOG_SOURCE: &str = "galaxy3d::FrameMemory";

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key of an UploadSession within a FrameMemory.
    ///
    /// A key becomes invalid only when its own session is removed.
    pub struct SessionKey;
}

// ===== CONFIGURATION =====

/// Configuration of a FrameMemory
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMemoryConfig {
    /// Vertex ring configuration of every session
    pub vertex: RingBufferConfig,
    /// Index ring configuration of every session
    pub index: RingBufferConfig,
    /// Free objects kept per scratch pool
    pub scratch_max_retained: usize,
}

impl Default for FrameMemoryConfig {
    fn default() -> Self {
        Self {
            vertex: RingBufferConfig::default(),
            index: RingBufferConfig::default(),
            scratch_max_retained: 64,
        }
    }
}

// ===== FRAME MEMORY =====

pub struct FrameMemory {
    device: Arc<dyn GraphicsDevice>,
    config: FrameMemoryConfig,
    sessions: SlotMap<SessionKey, UploadSession>,
    scratch: ScratchPools,
    shut_down: bool,
    _not_send: PhantomData<*const ()>,
}

impl FrameMemory {
    /// Create an empty frame memory
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` when a ring configuration is invalid.
    pub fn new(device: Arc<dyn GraphicsDevice>, config: FrameMemoryConfig) -> Result<Self> {
        config.vertex.validate()?;
        config.index.validate()?;

        engine_info!(LOG_SOURCE, "Created on device '{}' ({} vertex slots, {} index slots)",
            device.name(), config.vertex.slot_count, config.index.slot_count);

        Ok(Self {
            device,
            scratch: ScratchPools::new(config.scratch_max_retained),
            config,
            sessions: SlotMap::with_key(),
            shut_down: false,
            _not_send: PhantomData,
        })
    }

    // ===== SESSIONS =====

    /// Create an upload session with the configured rings
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` after `shutdown()`, or the ring creation error.
    pub fn create_session(&mut self, label: impl Into<String>) -> Result<SessionKey> {
        let label = label.into();
        if self.shut_down {
            return Err(Error::InvalidState(format!("cannot create session '{}' after shutdown", label)));
        }
        let session = UploadSession::new(
            Arc::clone(&self.device), label, self.config.vertex.clone(), self.config.index.clone(),
        )?;
        engine_debug!(LOG_SOURCE, "Created session '{}'", session.label());
        Ok(self.sessions.insert(session))
    }

    pub fn session(&self, key: SessionKey) -> Option<&UploadSession> {
        self.sessions.get(key)
    }

    pub fn session_mut(&mut self, key: SessionKey) -> Option<&mut UploadSession> {
        self.sessions.get_mut(key)
    }

    /// Drain, clear and drop a session
    ///
    /// Blocks until the device no longer reads the session's buffers.
    /// Returns false if the key is invalid.
    pub fn remove_session(&mut self, key: SessionKey) -> Result<bool> {
        let Some(session) = self.sessions.get_mut(key) else {
            return Ok(false);
        };
        session.drain()?;
        session.clear_buffers();
        if let Some(session) = self.sessions.remove(key) {
            engine_debug!(LOG_SOURCE, "Removed session '{}'", session.label());
        }
        Ok(true)
    }

    /// Iterate over every session
    pub fn sessions(&self) -> impl Iterator<Item = (SessionKey, &UploadSession)> {
        self.sessions.iter()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    // ===== FRAME =====

    /// Scratch containers for per-frame render-state construction
    pub fn scratch(&mut self) -> &mut ScratchPools {
        &mut self.scratch
    }

    /// Attach a submission fence to every session written this cycle
    pub fn mark_submitted(&mut self, fence: &Arc<dyn Fence>) {
        for session in self.sessions.values_mut() {
            session.mark_submitted(fence);
        }
    }

    /// Release retired buffers of every session; returns how many were released
    pub fn end_frame(&mut self) -> usize {
        self.sessions.values_mut().map(UploadSession::collect_retired).sum()
    }

    /// Whether the device can no longer read any session buffer
    pub fn is_safe_for_close(&self) -> bool {
        self.sessions.values().all(UploadSession::is_safe_for_close)
    }

    /// Counters of every ring, merged
    pub fn stats(&self) -> RingBufferStats {
        self.sessions.values().fold(RingBufferStats::default(), |mut total, session| {
            total.merge(&session.stats());
            total
        })
    }

    // ===== TEARDOWN =====

    /// Wait for every outstanding fence, then release every buffer and scratch pool
    ///
    /// Sessions stay registered but hold no memory. Calling it again is a no-op.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        for session in self.sessions.values_mut() {
            session.drain()?;
            session.clear_buffers();
        }
        self.scratch.clear();
        self.shut_down = true;
        engine_info!(LOG_SOURCE, "Shut down ({} sessions)", self.sessions.len());
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn config(&self) -> &FrameMemoryConfig {
        &self.config
    }
}

impl Drop for FrameMemory {
    fn drop(&mut self) {
        if !self.shut_down && !self.sessions.is_empty() {
            engine_warn!(LOG_SOURCE, "Dropped without shutdown ({} sessions)", self.sessions.len());
        }
    }
}

#[cfg(test)]
#[path = "frame_memory_tests.rs"]
mod tests;
