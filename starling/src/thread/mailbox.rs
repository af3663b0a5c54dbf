use std::fmt;

use crate::thread::message::Message;
use crate::thread::queue::BlockingQueue;

/// FIFO of messages waiting to be handled by one actor.
///
/// Any thread may push. Only the actor's own scheduling turn pops, one message
/// per turn, so messages are handled in the order they were sent.
pub struct Mailbox<K> {
    queue: BlockingQueue<Message<K>>,
}

impl<K> fmt::Debug for Mailbox<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("name", &self.queue.name())
            .field("len", &self.queue.len())
            .finish()
    }
}

impl<K> Mailbox<K> {
    pub fn new(owner: &str) -> Self {
        Self {
            queue: BlockingQueue::new(format!("{owner} (mailbox)")),
        }
    }

    pub fn push(&self, message: Message<K>) {
        self.queue.push(message);
    }

    /// Next message, without waiting.
    pub fn try_pop(&self) -> Option<Message<K>> {
        self.queue.try_pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Apply `visitor` to every queued message in order.
    pub fn for_each_mut<F>(&self, visitor: F)
    where
        F: FnMut(&mut Message<K>),
    {
        self.queue.for_each_mut(visitor);
    }

    pub fn drain(&self) -> Vec<Message<K>> {
        self.queue.drain()
    }
}
