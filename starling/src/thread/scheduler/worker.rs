//! # Worker Thread Implementation
//!
//! Each worker in a [`ThreadPool`](super::ThreadPool) owns a [`WorkerContext`]:
//! its ordinal id, its run-state and its thread handle.
//!
//! ## Run-state machine
//! `Idle -> Running` when the thread starts, `-> ShouldQuit` when asked to stop
//! (by the pool or by popping a `Task::Quit`), `-> HasQuit` when the thread
//! leaves its loop. Transitions never go backwards; a worker asked to quit
//! before it started goes straight from `ShouldQuit` to `HasQuit`.

use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, trace, warn};

use super::Task;
use crate::thread::queue::BlockingQueue;

/// Status codes for worker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Thread created but not yet running its loop
    Idle,

    /// Popping and executing tasks
    Running,

    /// Asked to stop; leaves its loop after the current task
    ShouldQuit,

    /// Left its loop; the thread is finished or about to be
    HasQuit,
}

/// Per-thread state of a pool worker.
pub struct WorkerContext {
    id: usize,
    state: Mutex<RunState>,
    settled: Condvar,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerContext")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl WorkerContext {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            state: Mutex::new(RunState::Idle),
            settled: Condvar::new(),
            thread: Mutex::new(None),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RunState {
        *self.lock_state()
    }

    pub fn should_quit(&self) -> bool {
        matches!(self.state(), RunState::ShouldQuit | RunState::HasQuit)
    }

    /// `Idle -> Running`. Returns false if the worker was already told to quit.
    fn mark_running(&self) -> bool {
        let mut state = self.lock_state();
        if *state == RunState::Idle {
            *state = RunState::Running;
            true
        } else {
            false
        }
    }

    /// Ask the worker to leave its loop after its current task.
    pub fn request_quit(&self) {
        let mut state = self.lock_state();
        if matches!(*state, RunState::Idle | RunState::Running) {
            *state = RunState::ShouldQuit;
        }
    }

    fn mark_quit(&self) {
        let mut state = self.lock_state();
        *state = RunState::HasQuit;
        self.settled.notify_all();
    }

    /// Blocks until the worker has left its loop.
    pub fn wait_until_quit(&self) {
        let mut state = self.lock_state();
        while *state != RunState::HasQuit {
            state = self
                .settled
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Whether the calling thread is this worker's thread.
    pub fn is_current_thread(&self) -> bool {
        self.thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| handle.thread().id() == thread::current().id())
    }

    /// Waits for the worker to quit and joins its thread.
    ///
    /// Called from the worker's own thread (the last owner of a pool can be a
    /// task), the handle is dropped instead, detaching the thread.
    pub(crate) fn join(&self) {
        if self.is_current_thread() {
            warn!(worker = self.id, "worker cannot join itself, detaching");
            self.thread
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            return;
        }

        self.wait_until_quit();
        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!(worker = self.id, "worker thread panicked outside of a task");
            }
        }
        trace!(worker = self.id, "worker joined");
    }

    /// Spawn the OS thread running the worker loop.
    pub(crate) fn start(
        self: &Arc<Self>,
        thread_name: String,
        tasks: Arc<BlockingQueue<Task>>,
        dispatch: tracing::Dispatch,
    ) -> io::Result<()> {
        let context = Arc::clone(self);
        let handle = thread::Builder::new().name(thread_name).spawn(move || {
            tracing::dispatcher::with_default(&dispatch, || run_loop(&context, &tasks));
        })?;
        *self.thread.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }
}

/// Marks the worker `HasQuit` when the loop exits, including by unwinding.
struct QuitGuard<'a>(&'a WorkerContext);

impl Drop for QuitGuard<'_> {
    fn drop(&mut self) {
        self.0.mark_quit();
    }
}

fn run_loop(context: &WorkerContext, tasks: &BlockingQueue<Task>) {
    let _guard = QuitGuard(context);
    if !context.mark_running() {
        debug!(worker = context.id, "worker told to quit before it started");
        return;
    }
    debug!(worker = context.id, queue = tasks.name(), "worker started");

    while !context.should_quit() {
        match tasks.pop() {
            Task::Job(job) => {
                if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(job)) {
                    error!(
                        worker = context.id,
                        "task panicked: {}",
                        panic_message(panic.as_ref())
                    );
                }
            }
            Task::Sentinel => {
                trace!(worker = context.id, "woken by sentinel");
            }
            Task::Quit => {
                debug!(worker = context.id, "popped quit marker");
                context.request_quit();
            }
        }
    }

    debug!(worker = context.id, "worker finished");
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions_are_one_directional() {
        let context = WorkerContext::new(1);
        assert_eq!(context.state(), RunState::Idle);

        assert!(context.mark_running());
        assert_eq!(context.state(), RunState::Running);
        assert!(!context.mark_running());

        context.request_quit();
        assert_eq!(context.state(), RunState::ShouldQuit);
        assert!(context.should_quit());

        context.mark_quit();
        assert_eq!(context.state(), RunState::HasQuit);

        // Terminal: a late quit request does not move it back.
        context.request_quit();
        assert_eq!(context.state(), RunState::HasQuit);
    }

    #[test]
    fn test_quit_before_start_skips_running() {
        let context = WorkerContext::new(2);
        context.request_quit();
        assert!(!context.mark_running());
        assert_eq!(context.state(), RunState::ShouldQuit);
    }

    #[test]
    fn test_worker_exits_on_sentinel_after_quit_request() {
        let context = Arc::new(WorkerContext::new(3));
        let tasks = Arc::new(BlockingQueue::new("tasks"));
        context
            .start("test-worker".into(), tasks.clone(), crate::logging::current_subscriber())
            .unwrap();

        // Wait until the worker is parked on the empty queue.
        while context.state() == RunState::Idle {
            thread::yield_now();
        }
        context.request_quit();
        tasks.push(Task::Sentinel);

        context.join();
        assert_eq!(context.state(), RunState::HasQuit);
    }

    #[test]
    fn test_worker_survives_panicking_task() {
        let context = Arc::new(WorkerContext::new(4));
        let tasks = Arc::new(BlockingQueue::new("tasks"));
        let (tx, rx) = std::sync::mpsc::channel();

        tasks.push(Task::new(|| panic!("boom")));
        tasks.push(Task::new(move || tx.send(7).unwrap()));
        tasks.push(Task::Quit);
        context
            .start("test-worker".into(), tasks.clone(), crate::logging::current_subscriber())
            .unwrap();

        assert_eq!(rx.recv().unwrap(), 7);
        context.join();
        assert_eq!(context.state(), RunState::HasQuit);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(3u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
