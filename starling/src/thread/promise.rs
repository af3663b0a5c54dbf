//! # Promise
//!
//! A single-assignment value shared between the party that resolves it and the
//! party that consumes it. A promise is either pending, resolved with a value,
//! or chained to another promise that will produce the value in its place.
//!
//! Chains are followed by [`Promise::get`]: the consumer waits on each link in
//! turn until it reaches a resolved promise. Every link it passes through is
//! consumed. A chain must end in a promise that is eventually resolved,
//! otherwise the consumer waits forever (or until its timeout).

use std::fmt;
use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::thread::error::PromiseError;

/// Externally visible state of a promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    /// No value yet, possibly chained to another promise
    Waiting,
    /// A value is stored and can be taken without blocking
    Resolved,
    /// The value has been consumed
    Complete,
}

enum Slot<T> {
    Pending,
    Resolved(T),
    Chained(Promise<T>),
    Taken,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    settled: Condvar,
}

/// Handle to a single-assignment value.
///
/// Cloning a handle does not clone the value: all clones refer to the same
/// slot. The value is produced at most once and consumed at most once.
pub struct Promise<T> {
    id: u64,
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Promise<T> {
    /// A pending promise.
    pub fn new() -> Self {
        Self::with_id(0)
    }

    /// A pending promise correlated to the message with the given id.
    pub fn with_id(id: u64) -> Self {
        Self::from_slot(id, Slot::Pending)
    }

    /// A promise whose value is available immediately.
    pub fn resolved(value: T) -> Self {
        Self::from_slot(0, Slot::Resolved(value))
    }

    fn from_slot(id: u64, slot: Slot<T>) -> Self {
        Self {
            id,
            shared: Arc::new(Shared {
                slot: Mutex::new(slot),
                settled: Condvar::new(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.shared
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn same_slot(&self, other: &Promise<T>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn state(&self) -> PromiseState {
        match *self.lock() {
            Slot::Pending | Slot::Chained(_) => PromiseState::Waiting,
            Slot::Resolved(_) => PromiseState::Resolved,
            Slot::Taken => PromiseState::Complete,
        }
    }

    /// Whether this promise has been resolved, chained or consumed.
    pub fn is_settled(&self) -> bool {
        !matches!(*self.lock(), Slot::Pending)
    }

    /// Store the value and wake any consumer.
    ///
    /// Resolving a promise twice is a contract violation and is rejected.
    pub fn resolve(&self, value: T) -> Result<(), PromiseError> {
        let mut slot = self.lock();
        match *slot {
            Slot::Pending => {
                *slot = Slot::Resolved(value);
                self.shared.settled.notify_all();
                Ok(())
            }
            Slot::Taken => Err(PromiseError::AlreadyConsumed),
            Slot::Resolved(_) | Slot::Chained(_) => Err(PromiseError::AlreadyResolved),
        }
    }

    /// Defer this promise's value to `child`.
    ///
    /// Rejected if this promise is already settled, or if `child` is this
    /// promise or leads back to it.
    pub fn chain(&self, child: Promise<T>) -> Result<(), PromiseError> {
        let mut link = child.clone();
        loop {
            if link.same_slot(self) {
                return Err(PromiseError::ChainCycle);
            }
            let next = match &*link.lock() {
                Slot::Chained(next) => next.clone(),
                _ => break,
            };
            link = next;
        }

        let mut slot = self.lock();
        match *slot {
            Slot::Pending => {
                trace!(parent = self.id, child = child.id, "promise chained");
                *slot = Slot::Chained(child);
                self.shared.settled.notify_all();
                Ok(())
            }
            Slot::Taken => Err(PromiseError::AlreadyConsumed),
            Slot::Resolved(_) | Slot::Chained(_) => Err(PromiseError::AlreadyResolved),
        }
    }

    /// Block until the value is available, following chain links, and take it.
    pub fn get(self) -> Result<T, PromiseError> {
        self.follow(None)
    }

    /// Like [`get`](Self::get), with one deadline for the whole chain.
    ///
    /// Links already passed through before the deadline stay consumed.
    pub fn get_timeout(self, timeout: Duration) -> Result<T, PromiseError> {
        self.follow(Some((Instant::now() + timeout, timeout)))
    }

    fn follow(self, deadline: Option<(Instant, Duration)>) -> Result<T, PromiseError> {
        let mut current = self;
        loop {
            let next = {
                let mut slot = current.lock();
                loop {
                    match mem::replace(&mut *slot, Slot::Taken) {
                        Slot::Resolved(value) => return Ok(value),
                        Slot::Chained(next) => break next,
                        Slot::Taken => return Err(PromiseError::AlreadyConsumed),
                        Slot::Pending => {
                            *slot = Slot::Pending;
                            slot = match deadline {
                                None => current
                                    .shared
                                    .settled
                                    .wait(slot)
                                    .unwrap_or_else(PoisonError::into_inner),
                                Some((at, timeout)) => {
                                    let remaining = at.saturating_duration_since(Instant::now());
                                    if remaining.is_zero() {
                                        return Err(PromiseError::Timeout(timeout));
                                    }
                                    current
                                        .shared
                                        .settled
                                        .wait_timeout(slot, remaining)
                                        .unwrap_or_else(PoisonError::into_inner)
                                        .0
                                }
                            };
                        }
                    }
                }
            };
            trace!(from = current.id, to = next.id, "following promise chain");
            current = next;
        }
    }

    /// Take the value without blocking if it is already resolved, otherwise
    /// hand the promise back.
    pub fn try_into_value(self) -> Result<T, Promise<T>> {
        let taken = {
            let mut slot = self.lock();
            match mem::replace(&mut *slot, Slot::Taken) {
                Slot::Resolved(value) => Some(value),
                other => {
                    *slot = other;
                    None
                }
            }
        };
        taken.ok_or(self)
    }
}
