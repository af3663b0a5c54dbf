use std::fmt;

use tracing::trace;

use crate::thread::queue::BlockingQueue;

/// Objects that can be returned to a [`RecyclePool`] and handed out again.
pub trait Recycle {
    /// Return the object to its canonical empty state.
    fn reset(&mut self);
}

/// A pool of reusable objects.
///
/// Objects are reset when they are released, so nothing acquired from the
/// pool carries state from its previous use.
pub struct RecyclePool<T> {
    items: BlockingQueue<T>,
    max_pooled: Option<usize>,
}

impl<T> fmt::Debug for RecyclePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecyclePool")
            .field("name", &self.items.name())
            .field("pooled", &self.items.len())
            .field("max_pooled", &self.max_pooled)
            .finish()
    }
}

impl<T: Recycle> RecyclePool<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            items: BlockingQueue::new(name),
            max_pooled: None,
        }
    }

    /// A pool that drops released objects once it holds `max_pooled` of them.
    pub fn bounded(name: impl Into<String>, max_pooled: usize) -> Self {
        Self {
            items: BlockingQueue::new(name),
            max_pooled: Some(max_pooled),
        }
    }

    /// Fill the pool with `count` objects built by `factory`.
    pub fn prefill<F>(&self, count: usize, factory: F)
    where
        F: FnMut() -> T,
    {
        let count = self
            .max_pooled
            .map_or(count, |max| count.min(max.saturating_sub(self.items.len())));
        self.items.extend(std::iter::repeat_with(factory).take(count));
    }

    /// Take a pooled object, if there is one.
    pub fn acquire(&self) -> Option<T> {
        self.items.try_pop()
    }

    /// Reset `item` and keep it for reuse. Returns false if the pool was full
    /// and the object was dropped instead.
    pub fn release(&self, mut item: T) -> bool {
        item.reset();
        // The bound is checked without holding the lock across the push, so
        // concurrent releases can overshoot it slightly.
        if self.max_pooled.is_some_and(|max| self.items.len() >= max) {
            trace!(pool = self.items.name(), "recycle pool full, dropping object");
            return false;
        }
        self.items.push(item);
        true
    }

    /// Release every object yielded by `items`. Returns how many were kept.
    pub fn release_all<I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        items
            .into_iter()
            .map(|item| self.release(item))
            .filter(|kept| *kept)
            .count()
    }

    /// Drop every pooled object. Returns how many there were.
    pub fn clear(&self) -> usize {
        let drained = self.items.drain();
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
