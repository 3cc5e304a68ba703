/// SequentialIndexBuffer - generated indices for meshes drawn without an index buffer
///
/// One cache of index bytes per (primitive mode, index type), grown to the
/// next power of two on demand and shared by every draw. Callers upload the
/// prefix they need through their index ring, so the bytes are fence-gated
/// like any other upload.

use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics_device::{IndexType, PrimitiveMode};
use crate::engine_debug;

/// Corner order of the two triangles of a quad
const QUAD_CORNERS: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Smallest cache ever generated, in indices
const MIN_CACHED_INDICES: u32 = 4;

/// Value of the index at `position` in a sequential index list
pub fn sequential_index(mode: PrimitiveMode, position: u32) -> u32 {
    match mode {
        PrimitiveMode::Lines | PrimitiveMode::Triangles => position,
        PrimitiveMode::Quads => {
            let quad = position / 6;
            quad * 4 + QUAD_CORNERS[(position % 6) as usize]
        }
    }
}

#[derive(Debug, Default)]
struct Cache {
    bytes: Vec<u8>,
    count: u32,
}

/// Per-mode sequential index caches
#[derive(Debug, Default)]
pub struct SequentialIndexBuffer {
    caches: FxHashMap<(PrimitiveMode, IndexType), Cache>,
}

impl SequentialIndexBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of the first `index_count` sequential indices
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` when the values do not fit `index_type`
    /// (more than 65536 vertices addressed with 16-bit indices).
    pub fn indices(&mut self, mode: PrimitiveMode, index_type: IndexType, index_count: u32) -> Result<&[u8]> {
        let cache = self.caches.entry((mode, index_type)).or_default();
        if cache.count < index_count {
            let target = index_count
                .checked_next_power_of_two()
                .unwrap_or(index_count)
                .max(MIN_CACHED_INDICES);
            Self::extend(cache, mode, index_type, target);
            engine_debug!("galaxy3d::SequentialIndexBuffer", "{:?}/{:?} grown to {} indices",
                mode, index_type, cache.count);
        }
        if cache.count < index_count {
            return Err(Error::InvalidResource(format!(
                "{} sequential {:?} indices do not fit {:?}", index_count, mode, index_type
            )));
        }
        let end = index_count as usize * index_type.bytes() as usize;
        Ok(&cache.bytes[..end])
    }

    /// Generate positions `cache.count..target`, stopping at the first value
    /// the index type cannot hold
    fn extend(cache: &mut Cache, mode: PrimitiveMode, index_type: IndexType, target: u32) {
        cache.bytes.reserve((target - cache.count) as usize * index_type.bytes() as usize);
        for position in cache.count..target {
            let value = sequential_index(mode, position);
            match index_type {
                IndexType::U16 => match u16::try_from(value) {
                    Ok(value) => cache.bytes.extend_from_slice(&value.to_ne_bytes()),
                    Err(_) => break,
                },
                IndexType::U32 => cache.bytes.extend_from_slice(&value.to_ne_bytes()),
            }
            cache.count = position + 1;
        }
    }

    /// Indices currently generated for one mode and type
    pub fn cached_count(&self, mode: PrimitiveMode, index_type: IndexType) -> u32 {
        self.caches.get(&(mode, index_type)).map_or(0, |cache| cache.count)
    }

    /// Drop every cache
    pub fn clear(&mut self) {
        self.caches.clear();
    }
}

#[cfg(test)]
#[path = "sequential_index_tests.rs"]
mod tests;
