// Integration tests for error types in starling::thread::error

use anyhow::anyhow;
use starling::thread::error::*;
use std::time::Duration;

#[test]
fn test_promise_error_display() {
    assert_eq!(PromiseError::AlreadyResolved.to_string(), "Promise is already resolved");
    assert_eq!(
        PromiseError::AlreadyConsumed.to_string(),
        "Promise value has already been consumed"
    );
    assert_eq!(PromiseError::ChainCycle.to_string(), "Chaining would create a cycle");
    assert_eq!(
        PromiseError::Timeout(Duration::from_millis(250)).to_string(),
        "Promise was not resolved within 250ms"
    );
    assert_eq!(PromiseError::Detached.to_string(), "Message carries no promise");
}

#[test]
fn test_pool_error_display() {
    assert_eq!(
        PoolError::InvalidSize(0).to_string(),
        "Thread pool needs at least one worker (requested 0)"
    );
    assert_eq!(
        PoolError::SpawnFailed("out of threads".to_string()).to_string(),
        "Failed to spawn worker thread: out of threads"
    );
}

#[test]
fn test_system_error_display_and_conversion() {
    assert_eq!(
        SystemError::NotBound("ping".to_string()).to_string(),
        "Actor is not bound to an actor system: ping"
    );

    let from_pool: SystemError = PoolError::InvalidSize(0).into();
    assert!(matches!(from_pool, SystemError::Pool(PoolError::InvalidSize(0))));
    assert_eq!(
        from_pool.to_string(),
        "Thread pool error: Thread pool needs at least one worker (requested 0)"
    );

    let other: SystemError = anyhow!("disk on fire").into();
    assert_eq!(other.to_string(), "Internal system error: disk on fire");
}

#[test]
fn test_zero_sized_system_rejected() {
    let config = starling::ActorSystemConfig::new("empty").with_pool_size(0);
    let err = starling::ActorSystem::<()>::with_config(config).unwrap_err();
    assert!(matches!(err, SystemError::Pool(PoolError::InvalidSize(0))));
}
