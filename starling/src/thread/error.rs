use std::time::Duration;
use thiserror::Error;

/// Errors related to Promise resolution and consumption.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromiseError {
    #[error("Promise is already resolved")]
    AlreadyResolved,
    #[error("Promise value has already been consumed")]
    AlreadyConsumed,
    #[error("Chaining would create a cycle")]
    ChainCycle,
    #[error("Promise was not resolved within {0:?}")]
    Timeout(Duration),
    #[error("Message carries no promise")]
    Detached,
}

/// Errors related to creating a ThreadPool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Thread pool needs at least one worker (requested {0})")]
    InvalidSize(usize),
    #[error("Failed to spawn worker thread: {0}")]
    SpawnFailed(String),
}

/// Errors related to the Actor System itself.
#[derive(Error, Debug)]
pub enum SystemError {
    #[error("Actor is already registered with a running system: {0}")]
    ActorAlreadyRegistered(String),
    #[error("Actor is not bound to an actor system: {0}")]
    NotBound(String),
    #[error("Thread pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("Internal system error: {0}")]
    Other(#[from] anyhow::Error),
}
