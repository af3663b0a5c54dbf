use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::worker::{RunState, WorkerContext};
use super::Task;
use crate::logging::current_subscriber;
use crate::thread::config::ThreadPoolConfig;
use crate::thread::error::PoolError;
use crate::thread::queue::BlockingQueue;

/// A fixed set of worker threads executing closures from a shared task queue.
///
/// Workers start as soon as the pool is created and keep popping tasks until
/// told to quit. Shutdown is cooperative: a worker always finishes the task it
/// is running before it observes its quit flag.
///
/// # Shutdown
/// - [`request_stop_all`](Self::request_stop_all): every worker goes to
///   `ShouldQuit`, queued tasks are discarded, and one sentinel per worker is
///   pushed so parked workers wake up.
/// - [`finish_all`](Self::finish_all): one quit marker per worker is queued
///   behind the existing work, so everything enqueued before the call runs.
/// - [`join_all`](Self::join_all): waits for each worker to reach `HasQuit`
///   and joins its thread.
///
/// Dropping the pool performs `request_stop_all` and `join_all` if workers
/// are still registered.
///
/// A worker stays in the registry until its thread has been joined, so a stop
/// request that arrives while `join_all` is waiting still reaches it. Every
/// worker re-checks its quit flag before each pop, and the flag is set before
/// the queue is drained. Each worker therefore pops at most once after the
/// drain, and at least one item per worker is queued after it, so no worker
/// can stay parked on an empty queue.
pub struct ThreadPool {
    name: String,
    size: usize,
    tasks: Arc<BlockingQueue<Task>>,
    workers: BlockingQueue<Arc<WorkerContext>>,
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("pending_tasks", &self.tasks.len())
            .field("workers", &self.workers.len())
            .finish()
    }
}

impl ThreadPool {
    /// Create a pool named `name` with `size` workers.
    pub fn new(name: impl Into<String>, size: usize) -> Result<Self, PoolError> {
        Self::with_config(ThreadPoolConfig::new(name, size))
    }

    /// Create a pool from configuration and start its workers.
    ///
    /// The tracing dispatcher active on the calling thread becomes the
    /// dispatcher of every worker thread.
    pub fn with_config(config: ThreadPoolConfig) -> Result<Self, PoolError> {
        if config.pool_size == 0 {
            return Err(PoolError::InvalidSize(config.pool_size));
        }

        let pool = Self {
            tasks: Arc::new(BlockingQueue::new(format!("{} (tasks)", config.name))),
            workers: BlockingQueue::new(format!("{} (workers)", config.name)),
            name: config.name,
            size: config.pool_size,
        };

        let dispatch = current_subscriber();
        for id in 1..=config.pool_size {
            let context = Arc::new(WorkerContext::new(id));
            let thread_name = format!("{}-{}", config.thread_name_prefix, id);
            // On failure, dropping `pool` stops and joins the workers already started.
            context
                .start(thread_name, Arc::clone(&pool.tasks), dispatch.clone())
                .map_err(|e| PoolError::SpawnFailed(e.to_string()))?;
            pool.workers.push(context);
        }

        info!(pool = %pool.name, size = pool.size, "thread pool started");
        Ok(pool)
    }

    /// Queue a closure for execution on one of the workers.
    pub fn enqueue<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.tasks.push(Task::new(f));
    }

    /// Tell every worker to quit, discard queued work, and wake parked workers.
    ///
    /// Returns how many queued jobs were discarded. Control markers left in
    /// the queue are not counted.
    pub fn request_stop_all(&self) -> usize {
        self.workers.for_each(|worker| worker.request_quit());

        let discarded = self.tasks.drain();
        let worker_count = self.workers.len();
        self.tasks
            .extend(std::iter::repeat_with(|| Task::Sentinel).take(worker_count));

        let jobs = discarded.iter().filter(|t| t.is_job()).count();
        debug!(
            pool = %self.name,
            discarded = jobs,
            sentinels = worker_count,
            "stop requested for all workers"
        );
        // Discarded closures are dropped here, outside the queue's lock.
        drop(discarded);
        jobs
    }

    /// Let every worker run what is already queued, then quit.
    pub fn finish_all(&self) {
        let worker_count = self.workers.len();
        self.tasks
            .extend(std::iter::repeat_with(|| Task::Quit).take(worker_count));
        crate::log_scheduler!(self.name.as_str(), "finish requested", workers = worker_count);
    }

    /// Wait for every worker to quit and join its thread.
    ///
    /// Blocks until each worker has been asked to quit, through
    /// `request_stop_all`, `finish_all` or dropping the pool.
    pub fn join_all(&self) {
        debug!(pool = %self.name, "joining workers");
        for worker in self.workers.snapshot() {
            worker.join();
            self.workers.remove_first(|w| w.id() == worker.id());
        }
        debug!(pool = %self.name, "all workers joined");
    }

    /// Stop, join and release the pool.
    pub fn destroy(self) {
        drop(self);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of workers the pool was created with.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of tasks waiting in the queue, control markers included.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Run-state of every worker not yet joined, keyed by worker id.
    pub fn worker_states(&self) -> Vec<(usize, RunState)> {
        let mut states = Vec::with_capacity(self.size);
        self.workers
            .for_each(|worker| states.push((worker.id(), worker.state())));
        states
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.request_stop_all();
            self.join_all();
        }
        drop(self.tasks.drain());
        debug!(pool = %self.name, "thread pool released");
    }
}
