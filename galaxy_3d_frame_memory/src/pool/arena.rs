//! Free-list arena shared by object pools and ring buffer recycling.
//!
//! An `Arena` keeps released items on a stack and hands them back out on
//! `acquire`. What "usable for this request" means, how a missing item is
//! created, and how a released item is cleaned up is decided by its
//! `ArenaStrategy`:
//!
//! - `ResetOnRecycle<T>`: plain objects, every free item fits, items are
//!   reset when recycled (used by `ObjectPool`).
//! - `RetiredBuffers`: device buffers, an item fits only once every fence
//!   that may still reference it has signaled and it is large enough.
//!
//! The most recently released acceptable item is always handed out first.
//!
//! # Example
//!
//! ```ignore
//! let mut arena = Arena::new(ResetOnRecycle::new(Vec::<u32>::new, Vec::clear));
//! let mut list = arena.acquire(&())?;   // created
//! list.push(7);
//! arena.release(list);                  // reset, back on the free list
//! let list = arena.acquire(&())?;       // recycled, empty
//! ```

use std::convert::Infallible;

/// Policy plugged into an `Arena`
pub trait ArenaStrategy {
    /// Item kept on the free list
    type Item;

    /// What the caller asks for (`()` for plain objects, a size for buffers)
    type Request;

    /// Error returned when a new item cannot be created
    type Error;

    /// Whether a free item may be handed out for `request`
    fn accepts(&self, item: &Self::Item, request: &Self::Request) -> bool;

    /// Create a new item when no free item is acceptable
    fn create(&mut self, request: &Self::Request) -> Result<Self::Item, Self::Error>;

    /// Prepare a released item for its next use
    fn reset(&mut self, item: &mut Self::Item);
}

/// Free-list arena driven by an `ArenaStrategy`
pub struct Arena<S: ArenaStrategy> {
    strategy: S,
    free: Vec<S::Item>,
    created: usize,
    max_retained: Option<usize>,
}

impl<S: ArenaStrategy> Arena<S> {
    /// Create an empty arena
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            free: Vec::new(),
            created: 0,
            max_retained: None,
        }
    }

    /// Limit the free list; items released beyond the limit are dropped
    pub fn with_max_retained(mut self, max_retained: usize) -> Self {
        self.max_retained = Some(max_retained);
        self
    }

    /// Maximum number of free items kept (`None` = unlimited)
    pub fn max_retained(&self) -> Option<usize> {
        self.max_retained
    }

    /// Remove and return the most recently released item accepted for `request`
    pub fn take(&mut self, request: &S::Request) -> Option<S::Item> {
        let strategy = &self.strategy;
        let position = self.free.iter().rposition(|item| strategy.accepts(item, request))?;
        Some(self.free.remove(position))
    }

    /// Hand out a free item, creating one through the strategy if none fits
    pub fn acquire(&mut self, request: &S::Request) -> Result<S::Item, S::Error> {
        if let Some(item) = self.take(request) {
            return Ok(item);
        }
        let item = self.strategy.create(request)?;
        self.created += 1;
        Ok(item)
    }

    /// Create `count` items up front and put them on the free list
    ///
    /// Ignores `max_retained`, so a pool can be warmed past its steady-state cap.
    pub fn prewarm(&mut self, count: usize, request: &S::Request) -> Result<(), S::Error> {
        self.free.reserve(count);
        for _ in 0..count {
            let item = self.strategy.create(request)?;
            self.created += 1;
            self.free.push(item);
        }
        Ok(())
    }

    /// Reset `item` and push it on the free list
    ///
    /// Returns `false` when the item was dropped because the arena is full.
    pub fn release(&mut self, mut item: S::Item) -> bool {
        if self.max_retained.is_some_and(|max| self.free.len() >= max) {
            return false;
        }
        self.strategy.reset(&mut item);
        self.free.push(item);
        true
    }

    /// Drop every free item matching `predicate`, returning how many were dropped
    pub fn evict(&mut self, mut predicate: impl FnMut(&S::Item) -> bool) -> usize {
        let before = self.free.len();
        self.free.retain(|item| !predicate(item));
        before - self.free.len()
    }

    /// Drop every free item, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let count = self.free.len();
        self.free.clear();
        count
    }

    /// Free items, oldest first
    pub fn iter(&self) -> std::slice::Iter<'_, S::Item> {
        self.free.iter()
    }

    /// Free items, oldest first
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, S::Item> {
        self.free.iter_mut()
    }

    /// Number of items on the free list
    pub fn len_free(&self) -> usize {
        self.free.len()
    }

    /// Whether the free list is empty
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    /// Number of items created by the strategy since the arena was built
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Strategy in use
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Strategy in use (mutable)
    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }
}

// ============================================================================
// ResetOnRecycle
// ============================================================================

/// Strategy for plain objects: any free item fits, reset runs on recycle
pub struct ResetOnRecycle<T> {
    factory: Box<dyn Fn() -> T>,
    reset: Box<dyn Fn(&mut T)>,
}

impl<T> ResetOnRecycle<T> {
    /// Build from a factory and a reset function
    pub fn new(factory: impl Fn() -> T + 'static, reset: impl Fn(&mut T) + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            reset: Box::new(reset),
        }
    }
}

impl<T> ArenaStrategy for ResetOnRecycle<T> {
    type Item = T;
    type Request = ();
    type Error = Infallible;

    fn accepts(&self, _item: &T, _request: &()) -> bool {
        true
    }

    fn create(&mut self, _request: &()) -> Result<T, Infallible> {
        Ok((self.factory)())
    }

    fn reset(&mut self, item: &mut T) {
        (self.reset)(item);
    }
}

#[cfg(test)]
#[path = "arena_tests.rs"]
mod tests;
