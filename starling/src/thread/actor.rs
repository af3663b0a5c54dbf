use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::thread;

use tracing::{debug, error, trace, warn};

use crate::thread::error::SystemError;
use crate::thread::mailbox::Mailbox;
use crate::thread::message::{ActorPromise, Message, Value};
use crate::thread::promise::Promise;
use crate::thread::scheduler::worker::panic_message;
use crate::thread::system::ActorSystem;

/// Lifecycle of an actor. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    /// Created, not yet spawned
    Dormant,
    /// Spawned and taking scheduling turns
    Alive,
    /// Killed; never scheduled again
    Dead,
}

impl ActorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ActorState::Dormant,
            1 => ActorState::Alive,
            _ => ActorState::Dead,
        }
    }
}

/// Whether the actor is currently inside its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Idle,
    Awake,
}

/// Per-message behaviour of an actor.
///
/// Returning `Some(promise)` makes the sender's promise follow it: if it is
/// already resolved its value is handed over directly, otherwise the sender's
/// promise is chained to it. Returning `None` resolves the sender's promise
/// with no value, unless the handler already answered via
/// [`Message::reply`].
pub trait Handler<K>: Send {
    fn receive(&mut self, actor: &Actor<K>, message: &Message<K>) -> Option<ActorPromise>;
}

impl<K, F> Handler<K> for F
where
    F: FnMut(&Actor<K>, &Message<K>) -> Option<ActorPromise> + Send,
{
    fn receive(&mut self, actor: &Actor<K>, message: &Message<K>) -> Option<ActorPromise> {
        self(actor, message)
    }
}

static NEXT_PID: AtomicU64 = AtomicU64::new(1);

/// A handler plus a mailbox, scheduled onto its system's thread pool.
///
/// Each scheduling turn handles at most one message and then resubmits the
/// actor, so one actor never has two turns in flight and its messages are
/// handled in the order they were sent.
pub struct Actor<K> {
    pid: u64,
    name: String,
    mailbox: Mailbox<K>,
    handler: Mutex<Box<dyn Handler<K>>>,
    state: AtomicU8,
    live_state: AtomicU8,
    system: RwLock<Weak<ActorSystem<K>>>,
    me: Weak<Actor<K>>,
}

impl<K> fmt::Debug for Actor<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("mailbox", &self.mailbox)
            .finish()
    }
}

impl<K> Actor<K> {
    pub fn pid(&self) -> u64 {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ActorState {
        ActorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn live_state(&self) -> LiveState {
        match self.live_state.load(Ordering::SeqCst) {
            0 => LiveState::Idle,
            _ => LiveState::Awake,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state() == ActorState::Alive
    }

    pub fn mailbox_len(&self) -> usize {
        self.mailbox.len()
    }

    /// The system this actor is bound to, if it still exists.
    pub fn system(&self) -> Option<Arc<ActorSystem<K>>> {
        self.system
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .upgrade()
    }

    pub(crate) fn downgrade(&self) -> Weak<Actor<K>> {
        self.me.clone()
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.system().is_some()
    }

    pub(crate) fn bind(&self, system: Weak<ActorSystem<K>>) {
        *self.system.write().unwrap_or_else(PoisonError::into_inner) = system;
    }

    /// Mark the actor dead and drop its queued messages without reaching
    /// back to its system. Used while the system itself is being dropped.
    pub(crate) fn detach(&self) {
        self.state.store(ActorState::Dead as u8, Ordering::SeqCst);
        drop(self.mailbox.drain());
    }

    fn set_live_state(&self, state: LiveState) {
        self.live_state.store(state as u8, Ordering::SeqCst);
    }
}

impl<K: Send + 'static> Actor<K> {
    /// A dormant actor with an empty mailbox, not bound to any system.
    pub fn new<H>(handler: H, name: impl Into<String>) -> Arc<Self>
    where
        H: Handler<K> + 'static,
    {
        let name = name.into();
        Arc::new_cyclic(|me| Self {
            pid: NEXT_PID.fetch_add(1, Ordering::Relaxed),
            mailbox: Mailbox::new(&name),
            name,
            handler: Mutex::new(Box::new(handler)),
            state: AtomicU8::new(ActorState::Dormant as u8),
            live_state: AtomicU8::new(LiveState::Idle as u8),
            system: RwLock::new(Weak::new()),
            me: me.clone(),
        })
    }

    /// Start taking scheduling turns.
    ///
    /// Does nothing unless the actor is dormant and bound to a system.
    /// Returns whether the actor was started.
    pub fn spawn(&self) -> bool {
        match self.try_spawn() {
            Ok(spawned) => spawned,
            Err(e) => {
                warn!(actor = %self.name, pid = self.pid, "cannot spawn: {}", e);
                false
            }
        }
    }

    /// Like [`spawn`](Self::spawn), failing with [`SystemError::NotBound`]
    /// when the actor has no system to run on.
    pub fn try_spawn(&self) -> Result<bool, SystemError> {
        let system = self
            .system()
            .ok_or_else(|| SystemError::NotBound(self.name.clone()))?;
        let spawned = self
            .state
            .compare_exchange(
                ActorState::Dormant as u8,
                ActorState::Alive as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if spawned {
            crate::log_lifecycle!("actor", self.name.as_str(), "spawned", pid = self.pid);
            self.schedule(&system);
        }
        Ok(spawned)
    }

    /// Queue `message` and return the promise of its reply.
    ///
    /// The promise carries the message id. Sending never fails; a message
    /// queued to an actor that never handles it resolves with `None` once the
    /// message is recycled or dropped.
    pub fn send(&self, mut message: Message<K>) -> ActorPromise {
        let promise = Promise::with_id(message.id());
        message.attach_promise(promise.clone());
        trace!(actor = %self.name, message_id = message.id(), "message queued");
        self.mailbox.push(message);
        promise
    }

    /// A message from this actor, taken from the system's pool when bound.
    pub fn message(&self, data: Option<Value>, kind: K) -> Message<K> {
        match self.system() {
            Some(system) => system.get_message(data, kind, Some(self)),
            None => Message::new(data, kind, Some(self)),
        }
    }

    /// Kill the actor. See [`kill_with`](Self::kill_with).
    pub fn kill(&self) -> bool {
        self.kill_with(|_| {})
    }

    /// Kill the actor, running `cleanup` on every message still queued.
    ///
    /// Only the first call has an effect: the actor leaves its system and
    /// its queued messages go back to the system's pool. The mailbox is
    /// drained before `cleanup` runs, so `cleanup` may send to this actor. Killing the last
    /// registered actor stops the system's thread pool. Returns whether this
    /// call killed the actor.
    pub fn kill_with<F>(&self, cleanup: F) -> bool
    where
        F: FnMut(&mut Message<K>),
    {
        let previous = self.state.swap(ActorState::Dead as u8, Ordering::SeqCst);
        if ActorState::from_u8(previous) == ActorState::Dead {
            return false;
        }
        crate::log_lifecycle!("actor", self.name.as_str(), "killed", pid = self.pid);

        let mut pending = self.mailbox.drain();
        pending.iter_mut().for_each(cleanup);
        match self.system() {
            Some(system) => {
                system.remove(self);
                let recycled = system.recycle_messages(pending);
                debug!(actor = %self.name, recycled, "queued messages recycled");
                if system.actor_count() == 0 {
                    debug!(system = system.name(), "last actor killed, stopping pool");
                    system.stop();
                }
            }
            None => drop(pending),
        }
        true
    }

    /// Kill the actor if needed and drop anything still in its mailbox.
    pub fn destroy(&self) {
        self.kill();
        let leftover = self.mailbox.drain();
        if !leftover.is_empty() {
            debug!(actor = %self.name, dropped = leftover.len(), "dropping undelivered messages");
        }
    }

    fn schedule(&self, system: &ActorSystem<K>) {
        let Some(actor) = self.me.upgrade() else {
            return;
        };
        system.pool().enqueue(move || actor.run_turn());
    }

    fn run_turn(self: Arc<Self>) {
        let Some(system) = self.system() else {
            trace!(actor = %self.name, "system gone, turn abandoned");
            return;
        };
        if self.state() == ActorState::Dead {
            return;
        }

        match self.mailbox.try_pop() {
            Some(message) => self.process(&system, message),
            None if system.config().yield_when_idle => thread::yield_now(),
            None => {}
        }

        if self.is_alive() {
            self.schedule(&system);
        }
    }

    fn process(&self, system: &ActorSystem<K>, mut message: Message<K>) {
        let _span = crate::actor_span!(self.name.as_str(), self.pid).entered();
        self.set_live_state(LiveState::Awake);
        let outcome = {
            let mut handler = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
            panic::catch_unwind(AssertUnwindSafe(|| handler.receive(self, &message)))
        };
        let returned = outcome.unwrap_or_else(|panic| {
            error!(
                actor = %self.name,
                message_id = message.id(),
                "handler panicked: {}",
                panic_message(panic.as_ref())
            );
            None
        });

        if self.state() == ActorState::Dead {
            trace!(actor = %self.name, message_id = message.id(), "actor died while handling message");
        }
        // Settled even when the actor died meanwhile; a reply from the
        // handler is left untouched.
        if let Some(promise) = message.take_promise() {
            self.settle(promise, returned);
        }

        system.put_message(message);
        self.set_live_state(LiveState::Idle);
    }

    fn settle(&self, promise: ActorPromise, returned: Option<ActorPromise>) {
        if promise.is_settled() {
            if returned.is_some() {
                warn!(
                    actor = %self.name,
                    message_id = promise.id(),
                    "handler replied and also returned a promise, ignoring the returned promise"
                );
            }
            return;
        }

        let settled = match returned {
            None => promise.resolve(None),
            Some(returned) => match returned.try_into_value() {
                Ok(value) => promise.resolve(value),
                Err(pending) => promise.chain(pending),
            },
        };
        if let Err(e) = settled {
            crate::log_error!(e, actor = %self.name, message_id = promise.id());
        }
    }
}
