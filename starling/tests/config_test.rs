// Integration tests for config types in starling::thread::config

use starling::thread::config::*;

#[test]
fn test_pool_config_defaults() {
    let config = ThreadPoolConfig::default();
    assert_eq!(config.name, "thread-pool");
    assert_eq!(config.pool_size, num_cpus::get());
    assert_eq!(config.thread_name_prefix, DEFAULT_THREAD_NAME_PREFIX);
}

#[test]
fn test_system_config_defaults() {
    let config = ActorSystemConfig::default();
    assert_eq!(config.name, "actor-system");
    assert_eq!(config.pool_size, num_cpus::get());
    assert_eq!(config.preallocated_messages, 0);
    assert!(config.max_pooled_messages.is_none());
    assert!(config.yield_when_idle);
}

#[test]
fn test_system_config_builders() {
    let config = ActorSystemConfig::new("stuff")
        .with_pool_size(3)
        .with_preallocated_messages(64)
        .with_max_pooled_messages(128)
        .with_yield_when_idle(false);

    assert_eq!(config.pool_size, 3);
    assert_eq!(config.preallocated_messages, 64);
    assert_eq!(config.max_pooled_messages, Some(128));
    assert!(!config.yield_when_idle);

    let pool = config.pool_config();
    assert_eq!(pool.name, "stuff pool");
    assert_eq!(pool.pool_size, 3);
    assert_eq!(pool.thread_name_prefix, "stuff-worker");
}
