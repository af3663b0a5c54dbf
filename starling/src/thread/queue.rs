use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

/// A FIFO queue guarded by a mutex and a "not empty" condition variable.
///
/// BlockingQueue is the synchronization primitive underneath the thread pool's
/// task queue, its worker registry, actor mailboxes, the actor registry and the
/// message recycle pool. Each queue owns its own lock; no two queues share one.
///
/// # Thread Safety
/// - Every operation takes the queue's lock for its whole duration
/// - `push` wakes exactly one blocked popper
/// - `pop` re-checks emptiness after every wakeup, so spurious wakeups are harmless
///
/// `is_empty` and `len` are snapshots. Use `try_pop` rather than `is_empty`
/// followed by `pop` when the caller must not block.
pub struct BlockingQueue<T> {
    name: String,
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingQueue")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}

impl<T> BlockingQueue<T> {
    /// Creates an empty queue. The name only shows up in logs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // A visitor that panics while the lock is held poisons the mutex; the
    // queue itself is still consistent, so keep using it.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item and wakes one blocked popper.
    pub fn push(&self, item: T) {
        let mut items = self.lock();
        items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Appends every item under a single lock acquisition, waking one popper per item.
    pub fn extend<I>(&self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut items = self.lock();
        for item in iter {
            items.push_back(item);
            self.not_empty.notify_one();
        }
    }

    /// Removes and returns the head, blocking while the queue is empty.
    pub fn pop(&self) -> T {
        let mut items = self.lock();
        let mut wakeups = 0usize;
        loop {
            if let Some(item) = items.pop_front() {
                return item;
            }
            if wakeups > 0 {
                trace!(queue = %self.name, wakeups, "woken with nothing to pop, waiting again");
            }
            items = self
                .not_empty
                .wait(items)
                .unwrap_or_else(PoisonError::into_inner);
            wakeups += 1;
        }
    }

    /// Removes and returns the head, or `None` if the queue is empty.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Like `pop`, but gives up once `timeout` has elapsed.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (guard, _) = self
                .not_empty
                .wait_timeout(items, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            items = guard;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Removes every item and hands them back in FIFO order.
    ///
    /// Items are returned rather than dropped in place so their destructors
    /// run after the lock has been released.
    pub fn drain(&self) -> Vec<T> {
        self.lock().drain(..).collect()
    }

    /// Visits every item in FIFO order while holding the lock.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&T),
    {
        self.lock().iter().for_each(|item| visitor(item));
    }

    /// Like [`for_each`](Self::for_each), with mutable access to each item.
    pub fn for_each_mut<F>(&self, mut visitor: F)
    where
        F: FnMut(&mut T),
    {
        self.lock().iter_mut().for_each(|item| visitor(item));
    }

    /// Returns true if any item matches. Stops at the first match.
    pub fn any<F>(&self, predicate: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        self.lock().iter().any(predicate)
    }

    /// Removes and returns the first item matching `predicate`.
    pub fn remove_first<F>(&self, mut predicate: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut items = self.lock();
        let index = items.iter().position(|item| predicate(item))?;
        items.remove(index)
    }
}

impl<T: Clone> BlockingQueue<T> {
    /// Copies the current contents in FIFO order.
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().iter().cloned().collect()
    }
}
