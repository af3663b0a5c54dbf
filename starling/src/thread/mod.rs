#![doc = " Blocking-thread actor runtime for Starling."]

pub mod actor;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod promise;
pub mod queue;
pub mod recycle;
pub mod scheduler;
pub mod system;

// Re-export key types for easier usage
pub use actor::{Actor, ActorState, Handler, LiveState};
pub use config::{ActorSystemConfig, ThreadPoolConfig};
pub use error::{PoolError, PromiseError, SystemError};
pub use mailbox::Mailbox;
pub use message::{ActorPromise, Message, Reply, Value};
pub use promise::{Promise, PromiseState};
pub use queue::BlockingQueue;
pub use recycle::{Recycle, RecyclePool};
pub use scheduler::{RunState, ThreadPool, WorkerContext};
pub use system::ActorSystem;
