pub const DEFAULT_THREAD_NAME_PREFIX: &str = "starling-worker";

// --- Thread Pool Configuration ---

/// Configuration for a `ThreadPool`.
#[derive(Clone, Debug)]
pub struct ThreadPoolConfig {
    /// Name of the pool, used in logs.
    pub name: String,

    /// The number of worker threads. Must be greater than zero.
    pub pool_size: usize,

    /// Prefix for worker thread names; the worker id is appended.
    pub thread_name_prefix: String,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            name: "thread-pool".to_string(),
            pool_size: num_cpus::get(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
        }
    }
}

impl ThreadPoolConfig {
    pub fn new(name: impl Into<String>, pool_size: usize) -> Self {
        Self {
            name: name.into(),
            pool_size,
            ..Default::default()
        }
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

// --- System Configuration ---

/// Configuration for an `ActorSystem`.
#[derive(Clone, Debug)]
pub struct ActorSystemConfig {
    /// Name of the system, used in logs and for the pool's thread names.
    pub name: String,

    /// The number of worker threads in the shared pool.
    pub pool_size: usize,

    /// Number of empty messages allocated into the recycle pool at startup.
    pub preallocated_messages: usize,

    /// Upper bound on pooled messages. Released messages beyond it are dropped.
    pub max_pooled_messages: Option<usize>,

    /// Whether a scheduling turn that finds an empty mailbox yields the OS thread
    /// before resubmitting itself.
    pub yield_when_idle: bool,
}

impl Default for ActorSystemConfig {
    fn default() -> Self {
        Self {
            name: "actor-system".to_string(),
            pool_size: num_cpus::get(),
            preallocated_messages: 0,
            max_pooled_messages: None,
            yield_when_idle: true,
        }
    }
}

impl ActorSystemConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_preallocated_messages(mut self, count: usize) -> Self {
        self.preallocated_messages = count;
        self
    }

    pub fn with_max_pooled_messages(mut self, max: usize) -> Self {
        self.max_pooled_messages = Some(max);
        self
    }

    pub fn with_yield_when_idle(mut self, yield_when_idle: bool) -> Self {
        self.yield_when_idle = yield_when_idle;
        self
    }

    /// Derive the configuration of the shared thread pool.
    pub fn pool_config(&self) -> ThreadPoolConfig {
        ThreadPoolConfig {
            name: format!("{} pool", self.name),
            pool_size: self.pool_size,
            thread_name_prefix: format!("{}-worker", self.name),
        }
    }
}
