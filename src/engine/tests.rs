//! Executor tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::executor::EngineThreadExecutor;
use super::mock::{LoadPlans, MockEngine};
use crate::Error;

fn executor() -> Arc<EngineThreadExecutor<MockEngine>> {
    Arc::new(EngineThreadExecutor::spawn(|| MockEngine::new(LoadPlans::new())).unwrap())
}

#[test]
fn test_run_returns_value() {
    let executor = executor();
    let value = executor.run(|_, _| Ok(42)).unwrap();
    assert_eq!(value, 42);
}

#[test]
fn test_run_propagates_errors() {
    let executor = executor();
    let result: crate::Result<()> = executor.run(|_, _| Err(Error::internal("boom")));
    assert!(matches!(result, Err(Error::Internal(_))));
}

#[test]
fn test_fifo_order() {
    let executor = executor();
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let order = order.clone();
        executor
            .post(move || order.lock().unwrap().push(i))
            .unwrap();
    }
    // A blocking run queues behind the posts
    let order_clone = order.clone();
    executor
        .run(move |_, _| {
            order_clone.lock().unwrap().push(99);
            Ok(())
        })
        .unwrap();

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 99]);
}

#[test]
fn test_timeout_releases_caller_and_sets_cancel_flag() {
    let executor = executor();
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = cancelled.clone();

    let start = Instant::now();
    let result = executor.run_timeout(50, move |_, token| {
        thread::sleep(Duration::from_millis(300));
        cancelled_clone.store(token.is_cancelled(), Ordering::SeqCst);
        Ok(())
    });

    assert!(matches!(result, Err(Error::ExecutorTimeout { timeout_ms: 50 })));
    assert!(start.elapsed() < Duration::from_millis(250));

    // The operation still ran to completion and observed the cancel flag;
    // the engine thread is alive and processes subsequent work.
    let value = executor.run(|_, _| Ok(7)).unwrap();
    assert_eq!(value, 7);
    assert!(cancelled.load(Ordering::SeqCst));
}

#[test]
fn test_zero_timeout_waits_unbounded() {
    let executor = executor();
    let value = executor
        .run_timeout(0, |_, _| {
            thread::sleep(Duration::from_millis(100));
            Ok("done")
        })
        .unwrap();
    assert_eq!(value, "done");
}

#[test]
fn test_engine_thread_callback_may_run_directly() {
    let executor = executor();
    let (tx, rx) = mpsc::channel();

    // A posted callback runs between operations, so its nested run call
    // takes the direct path instead of deadlocking behind the queue.
    let executor_clone = executor.clone();
    executor
        .post(move || {
            let result = executor_clone.run(|_, _| Ok(5));
            tx.send(result).unwrap();
        })
        .unwrap();

    let nested = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(nested.unwrap(), 5);
}

#[test]
fn test_nested_submit_inside_operation_fails_fast() {
    let executor = executor();
    let executor_clone = executor.clone();

    // The running operation holds the engine exclusively; a nested submit
    // must error out promptly rather than deadlock.
    let result = executor.run(move |_, _| executor_clone.run(|_, _| Ok(1)));
    assert!(matches!(result, Err(Error::Internal(_))));
}

#[test]
fn test_submissions_serialize_across_threads() {
    let executor = executor();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let executor = executor.clone();
        let log = log.clone();
        handles.push(thread::spawn(move || {
            executor
                .run(move |_, _| {
                    // Entry and exit recorded together; interleaving would split them
                    let mut log = log.lock().unwrap();
                    log.push((i, "enter"));
                    log.push((i, "exit"));
                    Ok(())
                })
                .unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 16);
    for pair in log.chunks(2) {
        assert_eq!(pair[0].0, pair[1].0);
        assert_eq!(pair[0].1, "enter");
        assert_eq!(pair[1].1, "exit");
    }
}
