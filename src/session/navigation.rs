//! Navigation control for one window
//!
//! Drives the load signal through a navigation: reset, start the load on the
//! engine thread under the page-load ceiling, wait out the remaining budget,
//! and cancel the in-flight load when the budget runs out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::engine::executor::EngineThreadExecutor;
use crate::engine::traits::{Engine, View};
use crate::session::window::Window;
use crate::{Error, Result};

pub struct NavigationController<E: Engine> {
    executor: Arc<EngineThreadExecutor<E>>,
    window: Arc<Window>,
    page_load_ms: u64,
}

impl<E: Engine> NavigationController<E> {
    pub fn new(
        executor: Arc<EngineThreadExecutor<E>>,
        window: Arc<Window>,
        page_load_ms: u64,
    ) -> Self {
        Self {
            executor,
            window,
            page_load_ms,
        }
    }

    /// Navigate to `url` and block until the load settles or the page-load
    /// budget is exhausted. Returns the terminal status code; a budget
    /// exhaustion cancels the in-flight load and raises
    /// `NavigationTimeout`. A zero budget waits forever.
    pub fn navigate(&self, url: &str) -> Result<i32> {
        let start = Instant::now();
        self.window.signal().reset();

        let view = self.window.view_id();
        let target = url.to_string();
        let started = self.executor.run_timeout(self.page_load_ms, move |engine, _| {
            let view = engine
                .view(view)
                .ok_or_else(|| Error::internal("view disposed during navigation"))?;
            view.load(&target);
            Ok(())
        });
        match started {
            Ok(()) => {}
            // The start itself outlived the ceiling; the deadline check
            // below raises the navigation timeout after cancelling.
            Err(Error::ExecutorTimeout { .. }) => {}
            Err(e) => return Err(e),
        }

        let status = if self.page_load_ms == 0 {
            self.window.signal().wait(None)
        } else {
            let total = Duration::from_millis(self.page_load_ms);
            match total.checked_sub(start.elapsed()) {
                Some(remaining) if !remaining.is_zero() => {
                    self.window.signal().wait(Some(remaining))
                }
                _ => self.window.signal().get(),
            }
        };

        if status.is_pending() {
            warn!(
                url = %url,
                timeout_ms = self.page_load_ms,
                "page load timed out, cancelling"
            );
            self.cancel_load()?;
            return Err(Error::navigation_timeout(self.page_load_ms));
        }

        debug!(url = %url, code = status.code(), "navigation settled");
        Ok(status.code())
    }

    /// Wait out any in-flight load under the page-load budget. Used by
    /// commands that must not run against a half-loaded page, including
    /// loads triggered indirectly by page scripts.
    pub fn wait_for_pending(&self) -> Result<i32> {
        let status = self.window.signal().wait(self.budget());
        if status.is_pending() {
            self.cancel_load()?;
            return Err(Error::navigation_timeout(self.page_load_ms));
        }
        Ok(status.code())
    }

    /// Blocking read of the status code under the page-load budget.
    /// Returns 0 when the signal never left Pending within the budget.
    pub fn status_code(&self) -> Result<i32> {
        Ok(self.window.signal().wait(self.budget()).code())
    }

    fn budget(&self) -> Option<Duration> {
        (self.page_load_ms > 0).then(|| Duration::from_millis(self.page_load_ms))
    }

    fn cancel_load(&self) -> Result<()> {
        let view = self.window.view_id();
        self.executor.run(move |engine, _| {
            if let Some(view) = engine.view(view) {
                view.cancel_load();
            }
            Ok(())
        })
    }
}
