//! Page-load status signal
//!
//! One signal per window, shared between the engine callback side and
//! waiting caller threads. The state machine is Pending → Success | Failure,
//! one-shot per navigation; only `reset` returns it to Pending.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::engine::traits::LoadEvent;

/// Wire-visible status code for a successful load with no known HTTP status
pub const GENERIC_SUCCESS: i32 = 200;
/// Wire-visible status code for a failed load
pub const LOAD_FAILED: i32 = -1;
/// Wire-visible status code for a cancelled load
pub const LOAD_CANCELLED: i32 = -2;

/// Terminal state of one navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Navigation in flight (or no navigation since the last reset)
    Pending,
    /// Load finished; code is positive, HTTP-like when known
    Success(i32),
    /// Load failed or was cancelled; code is negative
    Failure(i32),
}

impl LoadStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, LoadStatus::Pending)
    }

    /// The wire-visible integer code (0 while pending)
    pub fn code(&self) -> i32 {
        match self {
            LoadStatus::Pending => 0,
            LoadStatus::Success(code) | LoadStatus::Failure(code) => *code,
        }
    }
}

/// Monitor around the load status of one window
pub struct LoadStatusSignal {
    state: Mutex<LoadStatus>,
    cond: Condvar,
}

impl LoadStatusSignal {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoadStatus::Pending),
            cond: Condvar::new(),
        }
    }

    /// Force the signal back to Pending at the start of a navigation.
    /// Any outcome of a previous navigation is discarded.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = LoadStatus::Pending;
    }

    /// One-shot transition out of Pending. Resolutions arriving after the
    /// signal already settled belong to an abandoned navigation and are
    /// dropped.
    pub fn resolve(&self, status: LoadStatus) {
        if status.is_pending() {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.is_pending() {
            *state = status;
            self.cond.notify_all();
        } else {
            debug!(code = status.code(), "late load resolution ignored");
        }
    }

    /// Current status without waiting
    pub fn get(&self) -> LoadStatus {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until the signal leaves Pending or the budget runs out;
    /// `None` waits unbounded. Returns the status observed at the end of
    /// the wait, which is still Pending on timeout.
    ///
    /// The remaining budget is recomputed on every wake, so spurious
    /// wakeups cannot extend the deadline.
    pub fn wait(&self, budget: Option<Duration>) -> LoadStatus {
        let start = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if !state.is_pending() {
                return *state;
            }
            match budget {
                None => {
                    state = self.cond.wait(state).unwrap_or_else(|e| e.into_inner());
                }
                Some(total) => {
                    let remaining = match total.checked_sub(start.elapsed()) {
                        Some(remaining) if !remaining.is_zero() => remaining,
                        _ => return *state,
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

impl Default for LoadStatusSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine-callback adapter for one window's signal.
///
/// The engine holds a clone and invokes `on_event` from its load pipeline;
/// the observer maps engine events to signal transitions.
#[derive(Clone)]
pub struct LoadObserver {
    signal: Arc<LoadStatusSignal>,
}

impl LoadObserver {
    pub fn new(signal: Arc<LoadStatusSignal>) -> Self {
        Self { signal }
    }

    pub fn on_event(&self, event: LoadEvent) {
        match event {
            // Navigation start is driven by the controller's reset
            LoadEvent::Started => {}
            LoadEvent::Succeeded { status } => {
                let code = status.filter(|s| *s > 0).unwrap_or(GENERIC_SUCCESS);
                self.signal.resolve(LoadStatus::Success(code));
            }
            LoadEvent::Failed => self.signal.resolve(LoadStatus::Failure(LOAD_FAILED)),
            LoadEvent::Cancelled => self.signal.resolve(LoadStatus::Failure(LOAD_CANCELLED)),
        }
    }
}
