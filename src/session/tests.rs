//! Session tests: load signal, window registry, navigation control

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::context::Context;
use super::load::{LoadObserver, LoadStatus, LoadStatusSignal, LOAD_CANCELLED, LOAD_FAILED};
use super::navigation::NavigationController;
use crate::config::Timeouts;
use crate::engine::executor::EngineThreadExecutor;
use crate::engine::mock::{LoadPlan, LoadPlans, MockEngine};
use crate::engine::traits::{Engine, LoadEvent};
use crate::Error;

fn context_with(plans: LoadPlans) -> Context<MockEngine> {
    let executor =
        Arc::new(EngineThreadExecutor::spawn(move || MockEngine::new(plans)).unwrap());
    Context::new(executor, Timeouts::default(), None)
}

fn navigator(context: &Context<MockEngine>, page_load_ms: u64) -> NavigationController<MockEngine> {
    NavigationController::new(
        context.executor().clone(),
        context.active_window().unwrap(),
        page_load_ms,
    )
}

// --- LoadStatusSignal ---

#[test]
fn test_signal_resolves_once_per_navigation() {
    let signal = LoadStatusSignal::new();
    assert!(signal.get().is_pending());

    signal.resolve(LoadStatus::Success(200));
    assert_eq!(signal.get(), LoadStatus::Success(200));

    // A late resolution from an abandoned navigation is dropped
    signal.resolve(LoadStatus::Failure(LOAD_FAILED));
    assert_eq!(signal.get(), LoadStatus::Success(200));

    // Only reset returns the signal to Pending
    signal.reset();
    assert!(signal.get().is_pending());
    signal.resolve(LoadStatus::Failure(LOAD_FAILED));
    assert_eq!(signal.get(), LoadStatus::Failure(LOAD_FAILED));
}

#[test]
fn test_signal_wait_times_out_while_pending() {
    let signal = LoadStatusSignal::new();
    let start = Instant::now();
    let status = signal.wait(Some(Duration::from_millis(100)));
    assert!(status.is_pending());
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[test]
fn test_signal_wait_wakes_on_resolve() {
    let signal = Arc::new(LoadStatusSignal::new());
    let resolver = signal.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        resolver.resolve(LoadStatus::Success(204));
    });

    let status = signal.wait(Some(Duration::from_secs(5)));
    assert_eq!(status, LoadStatus::Success(204));
}

#[test]
fn test_signal_unbounded_wait() {
    let signal = Arc::new(LoadStatusSignal::new());
    let resolver = signal.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        resolver.resolve(LoadStatus::Success(200));
    });

    // No budget: blocks until the signal leaves Pending
    let status = signal.wait(None);
    assert_eq!(status.code(), 200);
}

#[test]
fn test_observer_event_mapping() {
    let signal = Arc::new(LoadStatusSignal::new());
    let observer = LoadObserver::new(signal.clone());

    observer.on_event(LoadEvent::Started);
    assert!(signal.get().is_pending());

    observer.on_event(LoadEvent::Succeeded { status: Some(404) });
    assert_eq!(signal.get(), LoadStatus::Success(404));

    signal.reset();
    observer.on_event(LoadEvent::Succeeded { status: None });
    assert_eq!(signal.get().code(), 200);

    signal.reset();
    observer.on_event(LoadEvent::Failed);
    assert_eq!(signal.get(), LoadStatus::Failure(LOAD_FAILED));

    signal.reset();
    observer.on_event(LoadEvent::Cancelled);
    assert_eq!(signal.get(), LoadStatus::Failure(LOAD_CANCELLED));
}

// --- SessionContextRegistry ---

#[test]
fn test_first_window_becomes_active() {
    let context = context_with(LoadPlans::new());
    let window = context.create_window().unwrap();
    assert_eq!(
        context.active_window().unwrap().handle(),
        window.handle()
    );
}

#[test]
fn test_window_handles_are_unique_and_stable() {
    let context = context_with(LoadPlans::new());
    let first = context.create_window().unwrap();
    let second = context.create_window().unwrap();
    let third = context.create_window().unwrap();

    let handles = context.window_handles().unwrap();
    assert_eq!(handles.len(), 3);
    assert_eq!(handles[0], first.handle());
    assert_eq!(handles[1], second.handle());
    assert_eq!(handles[2], third.handle());
    assert_ne!(first.handle(), second.handle());
    assert_ne!(second.handle(), third.handle());
}

#[test]
fn test_switch_window() {
    let context = context_with(LoadPlans::new());
    context.create_window().unwrap();
    let second = context.create_window().unwrap();

    context.switch_window(second.handle()).unwrap();
    assert_eq!(context.active_window().unwrap().handle(), second.handle());
}

#[test]
fn test_switch_to_unknown_handle() {
    let context = context_with(LoadPlans::new());
    context.create_window().unwrap();

    let result = context.switch_window("stale-handle");
    match result {
        Err(Error::UnknownWindowHandle(handle)) => assert_eq!(handle, "stale-handle"),
        other => panic!("expected UnknownWindowHandle, got {:?}", other.err()),
    }
}

#[test]
fn test_closing_active_window_promotes_oldest() {
    let context = context_with(LoadPlans::new());
    let first = context.create_window().unwrap();
    let second = context.create_window().unwrap();
    context.create_window().unwrap();

    context.switch_window(second.handle()).unwrap();
    context.close_window(second.handle()).unwrap();

    assert_eq!(context.active_window().unwrap().handle(), first.handle());
    assert_eq!(context.window_handles().unwrap().len(), 2);
}

#[test]
fn test_closing_last_window_leaves_no_active() {
    let context = context_with(LoadPlans::new());
    let window = context.create_window().unwrap();

    context.close_window(window.handle()).unwrap();
    assert!(context.window_handles().unwrap().is_empty());
    assert!(matches!(
        context.active_window(),
        Err(Error::NoActiveWindow)
    ));
}

#[test]
fn test_close_unknown_handle() {
    let context = context_with(LoadPlans::new());
    context.create_window().unwrap();
    assert!(matches!(
        context.close_window("bogus"),
        Err(Error::UnknownWindowHandle(_))
    ));
}

// --- NavigationController ---

#[test]
fn test_navigate_returns_status_code() {
    let plans = LoadPlans::new();
    plans.set(
        "http://ok.test/",
        LoadPlan::ok_after(200, Duration::from_millis(50)),
    );
    let context = context_with(plans);
    context.create_window().unwrap();

    let code = navigator(&context, 2000).navigate("http://ok.test/").unwrap();
    assert_eq!(code, 200);
}

#[test]
fn test_navigate_timeout_and_recovery() {
    let plans = LoadPlans::new();
    plans.set("http://hang.test/", LoadPlan::Hang);
    plans.set("http://ok.test/", LoadPlan::ok(200));
    let context = context_with(plans);
    context.create_window().unwrap();

    let nav = navigator(&context, 300);
    let start = Instant::now();
    let result = nav.navigate("http://hang.test/");
    let elapsed = start.elapsed();

    match result {
        Err(Error::NavigationTimeout { timeout_ms }) => assert_eq!(timeout_ms, 300),
        other => panic!("expected NavigationTimeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_millis(1500));

    // The timed-out navigation does not poison the next one
    let code = nav.navigate("http://ok.test/").unwrap();
    assert_eq!(code, 200);
}

#[test]
fn test_navigate_zero_budget_waits_forever() {
    let plans = LoadPlans::new();
    plans.set(
        "http://slow.test/",
        LoadPlan::ok_after(200, Duration::from_millis(400)),
    );
    let context = context_with(plans);
    context.create_window().unwrap();

    let start = Instant::now();
    let code = navigator(&context, 0).navigate("http://slow.test/").unwrap();
    assert_eq!(code, 200);
    assert!(start.elapsed() >= Duration::from_millis(350));
}

#[test]
fn test_navigate_failure_reports_negative_code() {
    let plans = LoadPlans::new();
    plans.set(
        "http://broken.test/",
        LoadPlan::Fail {
            delay: Duration::from_millis(20),
        },
    );
    let context = context_with(plans);
    context.create_window().unwrap();

    let code = navigator(&context, 2000)
        .navigate("http://broken.test/")
        .unwrap();
    assert_eq!(code, LOAD_FAILED);
}

#[test]
fn test_sequential_navigations_never_report_stale_status() {
    let plans = LoadPlans::new();
    plans.set("http://first.test/", LoadPlan::ok(200));
    plans.set("http://second.test/", LoadPlan::ok(404));
    let context = context_with(plans);
    context.create_window().unwrap();

    let nav = navigator(&context, 2000);
    nav.navigate("http://first.test/").unwrap();
    assert_eq!(nav.status_code().unwrap(), 200);

    nav.navigate("http://second.test/").unwrap();
    assert_eq!(nav.status_code().unwrap(), 404);
}

#[test]
fn test_wait_for_pending_settled_signal_returns_immediately() {
    let plans = LoadPlans::new();
    plans.set("http://ok.test/", LoadPlan::ok(200));
    let context = context_with(plans);
    context.create_window().unwrap();

    let nav = navigator(&context, 500);
    nav.navigate("http://ok.test/").unwrap();

    let start = Instant::now();
    assert_eq!(nav.wait_for_pending().unwrap(), 200);
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn test_wait_for_pending_times_out_on_stuck_load() {
    let plans = LoadPlans::new();
    plans.set("http://hang.test/", LoadPlan::Hang);
    let context = context_with(plans);
    let window = context.create_window().unwrap();

    // Start the stuck load without waiting on it
    let view = window.view_id();
    window.signal().reset();
    context
        .executor()
        .run(move |engine, _| {
            if let Some(view) = engine.view(view) {
                crate::engine::traits::View::load(view, "http://hang.test/");
            }
            Ok(())
        })
        .unwrap();

    let nav = navigator(&context, 200);
    assert!(matches!(
        nav.wait_for_pending(),
        Err(Error::NavigationTimeout { timeout_ms: 200 })
    ));
}
