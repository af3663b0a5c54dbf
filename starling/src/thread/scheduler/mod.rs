//! # Thread Scheduler Module
//!
//! A fixed-size pool of OS worker threads pulling boxed closures from one
//! shared [`BlockingQueue`](crate::thread::queue::BlockingQueue).
//!
//! ## Key Concepts
//! - Tasks: jobs to run, plus two control markers used only during shutdown
//! - Workers: one [`WorkerContext`] per thread carrying its run-state
//! - Shutdown: forceful (`request_stop_all`) or graceful (`finish_all`), then `join_all`

pub mod pool;
pub mod worker;

use std::fmt;

pub use pool::ThreadPool;
pub use worker::{RunState, WorkerContext};

/// Boxed closure executed by a worker thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work popped by a worker.
pub enum Task {
    /// Real work.
    Job(Job),
    /// Wakes a worker parked on an empty queue so it can observe its quit flag.
    /// Never executed.
    Sentinel,
    /// The worker that pops this marks itself SHOULD_QUIT and leaves its loop.
    Quit,
}

impl Task {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task::Job(Box::new(f))
    }

    /// Whether this is real work rather than a shutdown marker.
    pub fn is_job(&self) -> bool {
        matches!(self, Task::Job(_))
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Job(_) => f.write_str("Task::Job"),
            Task::Sentinel => f.write_str("Task::Sentinel"),
            Task::Quit => f.write_str("Task::Quit"),
        }
    }
}
