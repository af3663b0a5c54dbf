use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tracing::trace;

use crate::thread::actor::Actor;
use crate::thread::error::PromiseError;
use crate::thread::promise::Promise;
use crate::thread::recycle::Recycle;

/// Type-erased payload or reply value.
pub type Value = Box<dyn Any + Send>;

/// What a message's promise resolves to. `None` means the message was
/// handled (or dropped) without producing a value.
pub type Reply = Option<Value>;

/// Promise returned by [`Actor::send`].
pub type ActorPromise = Promise<Reply>;

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

fn next_message_id() -> u64 {
    NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A unit of data addressed to an actor.
///
/// `K` is the application's message kind, usually a small enum. Every message
/// gets a process-wide increasing id when it is first allocated; the id stays
/// with the message object when it is recycled.
///
/// While a message is in flight it carries the promise returned to its sender.
/// A message that is reset or dropped while that promise is still pending
/// resolves it with `None`, so the sender never waits on a message nobody will
/// process.
pub struct Message<K> {
    id: u64,
    kind: Option<K>,
    data: Option<Value>,
    from: Option<Weak<Actor<K>>>,
    promise: Option<ActorPromise>,
}

impl<K: fmt::Debug> fmt::Debug for Message<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("has_data", &self.data.is_some())
            .field("from", &self.sender().map(|a| a.name().to_string()))
            .field("promise", &self.promise)
            .finish()
    }
}

impl<K> Message<K> {
    /// A fresh message that does not come from a pool.
    pub fn new(data: Option<Value>, kind: K, from: Option<&Actor<K>>) -> Self {
        let mut message = Self::blank();
        message.refill(data, kind, from);
        message
    }

    /// An empty message with a fresh id, as stored in a recycle pool.
    pub(crate) fn blank() -> Self {
        Self {
            id: next_message_id(),
            kind: None,
            data: None,
            from: None,
            promise: None,
        }
    }

    pub(crate) fn refill(&mut self, data: Option<Value>, kind: K, from: Option<&Actor<K>>) {
        self.kind = Some(kind);
        self.data = data;
        self.from = from.map(Actor::downgrade);
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Overwrite the id, e.g. to carry an application-level sequence number.
    pub fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    /// The message kind. `None` only for a message sitting in a recycle pool.
    pub fn kind(&self) -> Option<&K> {
        self.kind.as_ref()
    }

    pub fn data(&self) -> Option<&(dyn Any + Send)> {
        self.data.as_deref()
    }

    /// The payload, if it is a `T`.
    pub fn data_as<T: Any>(&self) -> Option<&T> {
        self.data.as_ref().and_then(|data| data.downcast_ref::<T>())
    }

    pub fn take_data(&mut self) -> Option<Value> {
        self.data.take()
    }

    pub fn set_data(&mut self, data: Option<Value>) {
        self.data = data;
    }

    /// The sending actor, if one was recorded and it still exists.
    pub fn sender(&self) -> Option<Arc<Actor<K>>> {
        self.from.as_ref().and_then(Weak::upgrade)
    }

    pub fn promise(&self) -> Option<&ActorPromise> {
        self.promise.as_ref()
    }

    pub(crate) fn attach_promise(&mut self, promise: ActorPromise) {
        abandon(self.promise.replace(promise));
    }

    pub(crate) fn take_promise(&mut self) -> Option<ActorPromise> {
        self.promise.take()
    }

    /// Resolve this message's promise from inside a handler.
    ///
    /// The scheduling turn leaves an already resolved promise alone, so a
    /// handler can answer its sender and then kill its own actor.
    pub fn reply(&self, value: Reply) -> Result<(), PromiseError> {
        self.promise
            .as_ref()
            .ok_or(PromiseError::Detached)?
            .resolve(value)
    }
}

fn abandon(promise: Option<ActorPromise>) {
    if let Some(promise) = promise {
        if promise.resolve(None).is_ok() {
            trace!(message_id = promise.id(), "pending promise resolved with no value");
        }
    }
}

impl<K> Recycle for Message<K> {
    fn reset(&mut self) {
        abandon(self.promise.take());
        self.kind = None;
        self.data = None;
        self.from = None;
    }
}

impl<K> Drop for Message<K> {
    fn drop(&mut self) {
        abandon(self.promise.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread::promise::PromiseState;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Greet,
    }

    #[test]
    fn test_ids_increase() {
        let first: Message<Kind> = Message::new(None, Kind::Greet, None);
        let second: Message<Kind> = Message::new(None, Kind::Greet, None);
        assert!(second.id() > first.id());
    }

    #[test]
    fn test_payload_access() {
        let mut message = Message::new(Some(Box::new(String::from("hi"))), Kind::Greet, None);
        assert_eq!(message.kind(), Some(&Kind::Greet));
        assert_eq!(message.data_as::<String>().map(String::as_str), Some("hi"));
        assert!(message.data_as::<u32>().is_none());

        let data = message.take_data().unwrap();
        assert!(data.downcast::<String>().is_ok());
        assert!(message.data().is_none());
    }

    #[test]
    fn test_reset_keeps_id_and_clears_fields() {
        let mut message = Message::new(Some(Box::new(1u8)), Kind::Greet, None);
        let id = message.id();
        let promise = Promise::with_id(id);
        message.attach_promise(promise.clone());

        message.reset();
        assert_eq!(message.id(), id);
        assert!(message.kind().is_none());
        assert!(message.data().is_none());
        assert!(message.promise().is_none());

        // The abandoned promise completes with no value.
        assert!(promise.get().unwrap().is_none());
    }

    #[test]
    fn test_reply_without_promise() {
        let message: Message<Kind> = Message::new(None, Kind::Greet, None);
        assert_eq!(message.reply(None), Err(PromiseError::Detached));
    }

    #[test]
    fn test_reply_then_drop_keeps_value() {
        let mut message: Message<Kind> = Message::new(None, Kind::Greet, None);
        let promise = Promise::new();
        message.attach_promise(promise.clone());
        message.reply(Some(Box::new(5i32))).unwrap();
        drop(message);

        assert_eq!(promise.state(), PromiseState::Resolved);
        let value = promise.get().unwrap().unwrap();
        assert_eq!(*value.downcast::<i32>().unwrap(), 5);
    }
}
