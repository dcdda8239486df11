//! Engine thread executor
//!
//! All operations that touch the rendering engine run on exactly one
//! dedicated thread. Callers submit closures from any thread and block until
//! the closure finishes or their budget runs out. The engine thread processes
//! one operation at a time in submission order.

use std::any::Any;
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::engine::traits::Engine;
use crate::{Error, Result};

/// Cooperative cancellation flag handed to every submitted operation.
///
/// The executor sets the flag when the submitting caller gives up waiting;
/// long-running operations may poll it and unwind early. The engine thread
/// itself is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type Task<E> = Box<dyn FnOnce(&mut E, &CancelToken) + Send>;

enum Message<E> {
    /// An operation with a waiting submitter
    Op(Task<E>, CancelToken),
    /// A fire-and-forget callback, e.g. engine event dispatch
    Post(Box<dyn FnOnce() + Send>),
}

/// Runs all engine-affine operations on one dedicated thread.
///
/// The executor is `Send + Sync` even when the engine type is not: the engine
/// value is created on its thread and never crosses a thread boundary.
pub struct EngineThreadExecutor<E: Engine> {
    sender: Mutex<Option<Sender<Message<E>>>>,
    thread_id: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<E: Engine> EngineThreadExecutor<E> {
    /// Spawn the engine thread; `factory` builds the engine value on it.
    pub fn spawn<F>(factory: F) -> Result<Self>
    where
        F: FnOnce() -> E + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("oxidriver-engine".to_string())
            .spawn(move || {
                let _ = ready_tx.send(thread::current().id());
                engine_loop(factory, receiver);
            })
            .map_err(|e| Error::internal(format!("Failed to spawn engine thread: {}", e)))?;

        let thread_id = ready_rx
            .recv()
            .map_err(|_| Error::interrupted("engine thread exited during startup"))?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            thread_id,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Run an operation on the engine thread, blocking until it completes.
    pub fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut E, &CancelToken) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(op, None)
    }

    /// Run an operation with a hard wait ceiling. `timeout_ms == 0` waits
    /// unbounded. On timeout the caller gets `ExecutorTimeout`, the
    /// operation's cancel token is set, and the operation still runs to
    /// completion on the engine thread in FIFO order.
    pub fn run_timeout<T, F>(&self, timeout_ms: u64, op: F) -> Result<T>
    where
        F: FnOnce(&mut E, &CancelToken) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let budget = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));
        self.submit(op, budget)
    }

    /// Queue a fire-and-forget callback on the engine thread.
    ///
    /// The callback runs between operations, so it may itself call `run`;
    /// the call executes directly instead of deadlocking behind the queue.
    pub fn post<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.send(Message::Post(Box::new(callback)))
    }

    /// True when the calling code already runs on the engine thread.
    pub fn on_engine_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn submit<T, F>(&self, op: F, budget: Option<Duration>) -> Result<T>
    where
        F: FnOnce(&mut E, &CancelToken) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if self.on_engine_thread() {
            return Self::run_direct(op);
        }

        let slot = Arc::new(Slot::new());
        let completion = Completion::new(slot.clone());
        let token = CancelToken::new();
        let task_token = token.clone();

        let task: Task<E> = Box::new(move |engine, token| {
            completion.fill(op(engine, token));
        });
        self.send(Message::Op(task, task_token))?;

        match slot.wait(budget) {
            SlotWait::Done(result) => result,
            SlotWait::Abandoned => Err(Error::interrupted("engine operation produced no result")),
            SlotWait::TimedOut => {
                token.cancel();
                let timeout_ms = budget.map(|d| d.as_millis() as u64).unwrap_or(0);
                debug!(timeout_ms, "engine operation outlived its budget, cancel requested");
                Err(Error::executor_timeout(timeout_ms))
            }
        }
    }

    /// Execute directly on the engine thread. Permitted whenever the engine
    /// value is not already lent out to a running operation; a nested submit
    /// from inside an operation fails fast instead of deadlocking.
    fn run_direct<T, F>(op: F) -> Result<T>
    where
        F: FnOnce(&mut E, &CancelToken) -> Result<T>,
    {
        let Some(mut engine) = take_local::<E>() else {
            return Err(Error::internal(
                "re-entrant engine operation: engine is held by the running operation",
            ));
        };
        let token = CancelToken::new();
        let result = op(&mut engine, &token);
        restore_local(engine);
        result
    }

    fn send(&self, message: Message<E>) -> Result<()> {
        let sender = self
            .sender
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        sender
            .as_ref()
            .ok_or_else(|| Error::interrupted("engine thread is shut down"))?
            .send(message)
            .map_err(|_| Error::interrupted("engine thread is gone"))
    }
}

impl<E: Engine> Drop for EngineThreadExecutor<E> {
    fn drop(&mut self) {
        // Closing the queue lets the engine loop drain and exit
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        if let Ok(mut handle) = self.handle.lock() {
            if let Some(handle) = handle.take() {
                let _ = handle.join();
            }
        }
    }
}

thread_local! {
    static LOCAL_ENGINE: RefCell<Option<Box<dyn Any>>> = const { RefCell::new(None) };
}

fn take_local<E: 'static>() -> Option<Box<E>> {
    LOCAL_ENGINE.with(|slot| {
        let value = slot.borrow_mut().take()?;
        match value.downcast::<E>() {
            Ok(engine) => Some(engine),
            Err(other) => {
                *slot.borrow_mut() = Some(other);
                None
            }
        }
    })
}

fn restore_local<E: 'static>(engine: Box<E>) {
    LOCAL_ENGINE.with(|slot| *slot.borrow_mut() = Some(engine));
}

fn engine_loop<E, F>(factory: F, receiver: Receiver<Message<E>>)
where
    E: Engine,
    F: FnOnce() -> E,
{
    // The engine lives in the thread-local between operations so that
    // engine-thread callbacks can reach it through `run`.
    restore_local(Box::new(factory()));

    while let Ok(message) = receiver.recv() {
        match message {
            Message::Op(task, token) => {
                let Some(mut engine) = take_local::<E>() else {
                    break;
                };
                task(&mut engine, &token);
                restore_local(engine);
            }
            Message::Post(callback) => callback(),
        }
    }

    let _ = take_local::<E>();
}

enum SlotState<T> {
    Pending,
    Done(T),
    Abandoned,
}

enum SlotWait<T> {
    Done(T),
    Abandoned,
    TimedOut,
}

/// Per-submission completion slot shared between the caller and the task.
struct Slot<T> {
    state: Mutex<SlotState<T>>,
    cond: Condvar,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending),
            cond: Condvar::new(),
        }
    }

    fn fill(&self, value: T) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(*state, SlotState::Pending) {
            *state = SlotState::Done(value);
            self.cond.notify_all();
        }
    }

    fn abandon(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(*state, SlotState::Pending) {
            *state = SlotState::Abandoned;
            self.cond.notify_all();
        }
    }

    /// Wait for the slot to fill, recomputing the remaining budget on every
    /// wake so spurious wakeups cannot extend the deadline.
    fn wait(&self, budget: Option<Duration>) -> SlotWait<T> {
        let start = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if !matches!(*state, SlotState::Pending) {
                return match std::mem::replace(&mut *state, SlotState::Abandoned) {
                    SlotState::Done(value) => SlotWait::Done(value),
                    _ => SlotWait::Abandoned,
                };
            }
            match budget {
                None => {
                    state = self.cond.wait(state).unwrap_or_else(|e| e.into_inner());
                }
                Some(total) => {
                    let remaining = match total.checked_sub(start.elapsed()) {
                        Some(remaining) if !remaining.is_zero() => remaining,
                        _ => return SlotWait::TimedOut,
                    };
                    state = self
                        .cond
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(|e| e.into_inner())
                        .0;
                }
            }
        }
    }
}

/// Fills the slot exactly once; abandonment on drop covers a task that was
/// never run (queue torn down) or unwound mid-operation.
struct Completion<T> {
    slot: Arc<Slot<T>>,
    filled: bool,
}

impl<T> Completion<T> {
    fn new(slot: Arc<Slot<T>>) -> Self {
        Self { slot, filled: false }
    }

    fn fill(mut self, value: T) {
        self.slot.fill(value);
        self.filled = true;
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if !self.filled {
            self.slot.abandon();
        }
    }
}
