//! Ready-made pools for the containers render code builds every frame
//!
//! One `ObjectPool` per concrete container type (`Vec<T>`, `FxHashSet<T>`,
//! `FxHashMap<K, V>`), created on first use and reset with `clear()`, so
//! recycled containers keep their capacity.
//!
//! ```
//! use galaxy_3d_frame_memory::galaxy3d::pool::ScratchPools;
//!
//! let mut scratch = ScratchPools::new(64);
//! let mut visible = scratch.borrow_vec::<u32>();
//! visible.push(3);
//! scratch.recycle_vec(visible);
//! assert_eq!(scratch.free_count(), 1);
//! ```

use std::any::{Any, TypeId};
use std::hash::Hash;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::pool::object_pool::ObjectPool;

/// Type-erased view of one `ObjectPool<C>`
trait ScratchPool {
    fn len_free(&self) -> usize;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: 'static> ScratchPool for ObjectPool<C> {
    fn len_free(&self) -> usize {
        ObjectPool::len_free(self)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Typed scratch container pools
pub struct ScratchPools {
    max_retained: usize,
    pools: FxHashMap<TypeId, Box<dyn ScratchPool>>,
}

impl ScratchPools {
    /// Create empty pools; each keeps at most `max_retained` free containers
    pub fn new(max_retained: usize) -> Self {
        Self {
            max_retained,
            pools: FxHashMap::default(),
        }
    }

    /// Pool for `C`, created with `factory` and `reset` on first use
    fn pool<C: 'static>(&mut self, factory: fn() -> C, reset: fn(&mut C)) -> Option<&mut ObjectPool<C>> {
        let max_retained = self.max_retained;
        self.pools
            .entry(TypeId::of::<C>())
            .or_insert_with(|| Box::new(ObjectPool::new(factory, reset).with_max_retained(max_retained)))
            .as_any_mut()
            .downcast_mut::<ObjectPool<C>>()
    }

    /// Borrow an empty `Vec<T>`
    pub fn borrow_vec<T: 'static>(&mut self) -> Vec<T> {
        self.pool(Vec::new, Vec::clear).map_or_else(Vec::new, ObjectPool::borrow)
    }

    /// Return a `Vec<T>` to its pool
    pub fn recycle_vec<T: 'static>(&mut self, vec: Vec<T>) {
        if let Some(pool) = self.pool(Vec::new, Vec::clear) {
            pool.recycle(vec);
        }
    }

    /// Borrow an empty `FxHashSet<T>`
    pub fn borrow_set<T: Eq + Hash + 'static>(&mut self) -> FxHashSet<T> {
        self.pool(FxHashSet::default, FxHashSet::clear)
            .map_or_else(FxHashSet::default, ObjectPool::borrow)
    }

    /// Return an `FxHashSet<T>` to its pool
    pub fn recycle_set<T: Eq + Hash + 'static>(&mut self, set: FxHashSet<T>) {
        if let Some(pool) = self.pool(FxHashSet::default, FxHashSet::clear) {
            pool.recycle(set);
        }
    }

    /// Borrow an empty `FxHashMap<K, V>`
    pub fn borrow_map<K: Eq + Hash + 'static, V: 'static>(&mut self) -> FxHashMap<K, V> {
        self.pool(FxHashMap::default, FxHashMap::clear)
            .map_or_else(FxHashMap::default, ObjectPool::borrow)
    }

    /// Return an `FxHashMap<K, V>` to its pool
    pub fn recycle_map<K: Eq + Hash + 'static, V: 'static>(&mut self, map: FxHashMap<K, V>) {
        if let Some(pool) = self.pool(FxHashMap::default, FxHashMap::clear) {
            pool.recycle(map);
        }
    }

    /// Number of container types seen so far
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Free containers across every pool
    pub fn free_count(&self) -> usize {
        self.pools.values().map(|pool| pool.len_free()).sum()
    }

    /// Drop every pool and the containers they hold
    pub fn clear(&mut self) {
        self.pools.clear();
    }
}

#[cfg(test)]
#[path = "scratch_pools_tests.rs"]
mod tests;
