// Integration tests for starling::thread::scheduler::ThreadPool

use starling::logging;
use starling::thread::config::ThreadPoolConfig;
use starling::thread::scheduler::{RunState, ThreadPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn test_finish_all_runs_every_task_once() {
    logging::init_test();
    let pool = ThreadPool::new("finish", 4).unwrap();

    let runs: Arc<Vec<AtomicUsize>> = Arc::new((0..1000).map(|_| AtomicUsize::new(0)).collect());
    for n in 0..runs.len() {
        let runs = runs.clone();
        pool.enqueue(move || {
            runs[n].fetch_add(1, Ordering::SeqCst);
        });
    }

    pool.finish_all();
    pool.join_all();

    assert!(runs.iter().all(|count| count.load(Ordering::SeqCst) == 1));
    assert_eq!(pool.pending_tasks(), 0);
}

#[test]
fn test_request_stop_all_never_runs_a_task_twice() {
    logging::init_test();
    let pool = ThreadPool::new("stop", 3).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..10_000 {
        let counter = counter.clone();
        pool.enqueue(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }

    pool.request_stop_all();
    pool.join_all();
    assert!(counter.load(Ordering::SeqCst) <= 10_000);
    assert!(pool.worker_states().is_empty());
}

#[test]
fn test_stop_then_join_leaves_workers_quit() {
    logging::init_test();
    let pool = ThreadPool::new("states", 2).unwrap();
    pool.request_stop_all();

    let states = pool.worker_states();
    assert_eq!(states.len(), 2);
    assert!(states
        .iter()
        .all(|(_, state)| matches!(state, RunState::ShouldQuit | RunState::HasQuit)));

    pool.join_all();
}

#[test]
fn test_worker_thread_names_use_prefix() {
    logging::init_test();
    let config = ThreadPoolConfig::new("named", 2).with_thread_name_prefix("crunch");
    let pool = ThreadPool::with_config(config).unwrap();

    let names = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..20 {
        let names = names.clone();
        pool.enqueue(move || {
            let name = thread::current().name().map(str::to_string);
            names.lock().unwrap().push(name);
        });
    }
    pool.finish_all();
    pool.join_all();

    let names = names.lock().unwrap();
    assert_eq!(names.len(), 20);
    assert!(names
        .iter()
        .all(|name| matches!(name.as_deref(), Some("crunch-1") | Some("crunch-2"))));
}

#[test]
fn test_panicking_task_does_not_kill_worker() {
    logging::init_test();
    let pool = ThreadPool::new("panics", 1).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    pool.enqueue(|| panic!("task failure"));
    let after = counter.clone();
    pool.enqueue(move || {
        after.fetch_add(1, Ordering::SeqCst);
    });

    pool.finish_all();
    pool.join_all();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stop_reaches_workers_while_join_is_waiting() {
    logging::init_test();
    let pool = Arc::new(ThreadPool::new("late-stop", 2).unwrap());

    let (done_tx, done_rx) = mpsc::channel();
    let joiner = pool.clone();
    let handle = thread::spawn(move || {
        joiner.join_all();
        done_tx.send(()).unwrap();
    });

    // Give the joiner time to start waiting on the first worker.
    thread::sleep(Duration::from_millis(100));
    assert_eq!(pool.worker_states().len(), 2);
    pool.request_stop_all();

    assert!(
        done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
        "join_all did not return after request_stop_all"
    );
    handle.join().unwrap();
    assert!(pool.worker_states().is_empty());
}
