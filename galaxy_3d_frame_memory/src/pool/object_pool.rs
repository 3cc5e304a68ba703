//! Single-thread object pool for scratch containers.
//!
//! `borrow()` pops the most recently recycled object or builds a new one
//! with the factory; `recycle()` resets the object and keeps it for the
//! next borrow. Once warmed up, a per-frame borrow/recycle loop allocates
//! nothing.
//!
//! The pool is confined to the render thread: it is neither `Send` nor
//! `Sync`. Recycling an object that is still referenced elsewhere is not
//! detected; the caller must have given up every other handle.
//!
//! # Example
//!
//! ```
//! use galaxy_3d_frame_memory::galaxy3d::pool::ObjectPool;
//!
//! let mut pool = ObjectPool::new(Vec::<u32>::new, Vec::clear);
//! let mut ids = pool.borrow();
//! ids.extend([1, 2, 3]);
//! pool.recycle(ids);
//!
//! let ids = pool.borrow();
//! assert!(ids.is_empty());
//! assert_eq!(pool.created_count(), 1);
//! ```

use std::marker::PhantomData;
use crate::pool::arena::{Arena, ResetOnRecycle};

/// Free-list recycler for one object type
pub struct ObjectPool<T> {
    arena: Arena<ResetOnRecycle<T>>,
    _not_send: PhantomData<*const ()>,
}

impl<T> ObjectPool<T> {
    /// Create an empty pool
    ///
    /// # Arguments
    ///
    /// * `factory` - Builds a fresh object when the free list is empty
    /// * `reset` - Returns a recycled object to its empty state
    pub fn new(factory: impl Fn() -> T + 'static, reset: impl Fn(&mut T) + 'static) -> Self {
        Self {
            arena: Arena::new(ResetOnRecycle::new(factory, reset)),
            _not_send: PhantomData,
        }
    }

    /// Create a pool with `count` objects already built
    pub fn prewarmed(count: usize, factory: impl Fn() -> T + 'static, reset: impl Fn(&mut T) + 'static) -> Self {
        let mut pool = Self::new(factory, reset);
        match pool.arena.prewarm(count, &()) {
            Ok(()) => pool,
            Err(never) => match never {},
        }
    }

    /// Keep at most `max_retained` free objects; extra recycles are dropped
    pub fn with_max_retained(self, max_retained: usize) -> Self {
        Self {
            arena: self.arena.with_max_retained(max_retained),
            _not_send: PhantomData,
        }
    }

    /// Take an object from the pool, building one if none is free
    pub fn borrow(&mut self) -> T {
        match self.arena.acquire(&()) {
            Ok(obj) => obj,
            Err(never) => match never {},
        }
    }

    /// Reset `obj` and return it to the pool
    pub fn recycle(&mut self, obj: T) {
        self.arena.release(obj);
    }

    /// Number of objects waiting on the free list
    pub fn len_free(&self) -> usize {
        self.arena.len_free()
    }

    /// Number of objects the factory has built
    pub fn created_count(&self) -> usize {
        self.arena.created_count()
    }

    /// Drop every free object
    pub fn shrink(&mut self) -> usize {
        self.arena.clear()
    }
}

#[cfg(test)]
#[path = "object_pool_tests.rs"]
mod tests;
