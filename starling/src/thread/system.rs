//! # Actor System
//!
//! `ActorSystem` owns the shared [`ThreadPool`] every actor is scheduled on,
//! the registry of live actors, and the pool of recycled [`Message`]s.
//!
//! Typical use:
//! 1. create the system and the actors, [`add`](ActorSystem::add) each actor,
//! 2. [`run`](ActorSystem::run) to spawn them,
//! 3. send messages and wait on the returned promises,
//! 4. kill the actors (killing the last one stops the pool) and
//!    [`join`](ActorSystem::join).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tracing::{debug, info};

use crate::thread::actor::{Actor, Handler};
use crate::thread::config::ActorSystemConfig;
use crate::thread::error::SystemError;
use crate::thread::message::{Message, Value};
use crate::thread::queue::BlockingQueue;
use crate::thread::recycle::RecyclePool;
use crate::thread::scheduler::ThreadPool;

pub struct ActorSystem<K> {
    name: String,
    config: ActorSystemConfig,
    actors: BlockingQueue<Arc<Actor<K>>>,
    messages: RecyclePool<Message<K>>,
    pool: ThreadPool,
    stopped: AtomicBool,
    me: Weak<ActorSystem<K>>,
}

impl<K> fmt::Debug for ActorSystem<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorSystem")
            .field("name", &self.name)
            .field("actors", &self.actors.len())
            .field("pooled_messages", &self.messages.len())
            .field("pool", &self.pool)
            .finish()
    }
}

impl<K: Send + 'static> ActorSystem<K> {
    /// A system with default configuration under `name`.
    pub fn new(name: impl Into<String>) -> Result<Arc<Self>, SystemError> {
        Self::with_config(ActorSystemConfig::new(name))
    }

    /// Create the system and start its thread pool.
    pub fn with_config(config: ActorSystemConfig) -> Result<Arc<Self>, SystemError> {
        let pool = ThreadPool::with_config(config.pool_config())?;

        let pool_name = format!("{} (messages)", config.name);
        let messages = match config.max_pooled_messages {
            Some(max) => RecyclePool::bounded(pool_name, max),
            None => RecyclePool::new(pool_name),
        };
        messages.prefill(config.preallocated_messages, Message::blank);

        let system = Arc::new_cyclic(|me| Self {
            name: config.name.clone(),
            actors: BlockingQueue::new(format!("{} (actors)", config.name)),
            messages,
            pool,
            stopped: AtomicBool::new(false),
            me: me.clone(),
            config,
        });
        crate::log_system!(
            "create",
            "completed",
            system = %system.name,
            workers = system.pool.size(),
            pooled_messages = system.messages.len()
        );
        Ok(system)
    }

    /// Create an actor and register it with this system.
    pub fn create_actor<H>(
        &self,
        handler: H,
        name: impl Into<String>,
    ) -> Result<Arc<Actor<K>>, SystemError>
    where
        H: Handler<K> + 'static,
    {
        let actor = Actor::new(handler, name);
        self.add(&actor)?;
        Ok(actor)
    }

    /// Bind `actor` to this system and register it.
    ///
    /// Fails if the actor is already bound to a system that still exists.
    pub fn add(&self, actor: &Arc<Actor<K>>) -> Result<(), SystemError> {
        if actor.is_bound() {
            return Err(SystemError::ActorAlreadyRegistered(actor.name().to_string()));
        }
        actor.bind(self.me.clone());
        self.actors.push(Arc::clone(actor));
        debug!(system = %self.name, actor = actor.name(), pid = actor.pid(), "actor registered");
        Ok(())
    }

    /// Unregister the actor with `actor`'s pid. Returns whether it was found.
    pub fn remove(&self, actor: &Actor<K>) -> bool {
        let removed = self.actors.remove_first(|a| a.pid() == actor.pid());
        if removed.is_some() {
            debug!(system = %self.name, actor = actor.name(), pid = actor.pid(), "actor unregistered");
        }
        removed.is_some()
    }

    /// Spawn every registered actor.
    pub fn run(&self) {
        let actors = self.actors.snapshot();
        let spawned = actors.iter().filter(|actor| actor.spawn()).count();
        crate::log_system!("run", "completed", system = %self.name, spawned);
    }

    /// Tell the pool's workers to quit. Queued turns are discarded.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!(system = %self.name, "stopping actor system");
        }
        self.pool.request_stop_all();
    }

    /// Wait for the pool's workers to quit.
    pub fn join(&self) {
        self.pool.join_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// A message from the recycle pool, or a new one if the pool is empty.
    pub fn get_message(&self, data: Option<Value>, kind: K, from: Option<&Actor<K>>) -> Message<K> {
        match self.messages.acquire() {
            Some(mut message) => {
                message.refill(data, kind, from);
                message
            }
            None => Message::new(data, kind, from),
        }
    }

    /// Return a message to the recycle pool.
    pub fn put_message(&self, message: Message<K>) -> bool {
        self.messages.release(message)
    }

    /// Return every message in `messages` to the recycle pool. Returns how
    /// many were kept.
    pub fn recycle_messages<I>(&self, messages: I) -> usize
    where
        I: IntoIterator<Item = Message<K>>,
    {
        self.messages.release_all(messages)
    }

    /// Free every pooled message.
    pub fn clear_messages(&self) -> usize {
        self.messages.clear()
    }

    pub fn pooled_messages(&self) -> usize {
        self.messages.len()
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn actors(&self) -> Vec<Arc<Actor<K>>> {
        self.actors.snapshot()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ActorSystemConfig {
        &self.config
    }

    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    /// Destroy every actor, free pooled messages, and stop and join the pool.
    pub fn destroy(&self) {
        let actors = self.actors.drain();
        let destroyed = actors.len();
        for actor in actors {
            actor.destroy();
        }
        let freed = self.messages.clear();
        self.stop();
        self.join();
        crate::log_system!("destroy", "completed", system = %self.name, destroyed, freed);
    }
}

impl<K> Drop for ActorSystem<K> {
    fn drop(&mut self) {
        // Actors can no longer reach this system, so destroying them drops
        // their queued messages instead of recycling them.
        for actor in self.actors.drain() {
            actor.detach();
        }
        self.messages.clear();
        debug!(system = %self.name, "actor system released");
    }
}
