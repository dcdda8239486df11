//! Session context: the window registry for one driver instance
//!
//! Owns the executor, the current timeout generation, capability metadata,
//! and the set of windows. Registry mutation is atomic with respect to
//! concurrent handle enumeration; a single lock guards the window list and
//! the active selection together.

use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use tracing::{debug, info};

use crate::config::Timeouts;
use crate::engine::executor::EngineThreadExecutor;
use crate::engine::traits::{Engine, View};
use crate::session::load::LoadStatusSignal;
use crate::session::window::Window;
use crate::{Error, Result};

struct Registry {
    windows: Vec<Arc<Window>>,
    active: Option<String>,
}

pub struct Context<E: Engine> {
    executor: Arc<EngineThreadExecutor<E>>,
    timeouts: RwLock<Arc<Timeouts>>,
    capabilities: RwLock<Option<Value>>,
    init_script: Mutex<Option<String>>,
    registry: Mutex<Registry>,
}

impl<E: Engine> Context<E> {
    pub fn new(
        executor: Arc<EngineThreadExecutor<E>>,
        timeouts: Timeouts,
        init_script: Option<String>,
    ) -> Self {
        Self {
            executor,
            timeouts: RwLock::new(Arc::new(timeouts)),
            capabilities: RwLock::new(None),
            init_script: Mutex::new(init_script),
            registry: Mutex::new(Registry {
                windows: Vec::new(),
                active: None,
            }),
        }
    }

    pub fn executor(&self) -> &Arc<EngineThreadExecutor<E>> {
        &self.executor
    }

    /// Current timeout generation
    pub fn timeouts(&self) -> Arc<Timeouts> {
        self.timeouts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the timeout generation wholesale
    pub fn set_timeouts(&self, timeouts: Timeouts) {
        *self.timeouts.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(timeouts);
    }

    pub fn capabilities(&self) -> Option<Value> {
        self.capabilities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn store_capabilities(&self, capabilities: Value) {
        *self.capabilities.write().unwrap_or_else(|e| e.into_inner()) = Some(capabilities);
    }

    /// Open a new window: create its engine view, register the init script,
    /// and start it on a blank document so the load signal settles.
    pub fn create_window(&self) -> Result<Arc<Window>> {
        let signal = Arc::new(LoadStatusSignal::new());
        let observer = crate::session::load::LoadObserver::new(signal.clone());
        let init_script = self
            .init_script
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .clone();

        let view = self.executor.run(move |engine, _| {
            let id = engine.create_view(observer);
            if let Some(view) = engine.view(id) {
                if let Some(script) = init_script {
                    view.set_init_script(script);
                }
                view.load("about:blank");
            }
            Ok(id)
        })?;

        let window = Arc::new(Window::new(view, signal));
        let mut registry = self.lock_registry()?;
        registry.windows.push(window.clone());
        if registry.active.is_none() {
            registry.active = Some(window.handle().to_string());
        }
        info!(window = %window.handle(), "window created");
        Ok(window)
    }

    /// The active window, or `NoActiveWindow` when every window is closed
    pub fn active_window(&self) -> Result<Arc<Window>> {
        let registry = self.lock_registry()?;
        let handle = registry.active.as_deref().ok_or(Error::NoActiveWindow)?;
        registry
            .windows
            .iter()
            .find(|w| w.handle() == handle)
            .cloned()
            .ok_or(Error::NoActiveWindow)
    }

    /// Handles of all open windows, oldest first
    pub fn window_handles(&self) -> Result<Vec<String>> {
        let registry = self.lock_registry()?;
        Ok(registry
            .windows
            .iter()
            .map(|w| w.handle().to_string())
            .collect())
    }

    /// Make the given window active
    pub fn switch_window(&self, handle: &str) -> Result<()> {
        let mut registry = self.lock_registry()?;
        if !registry.windows.iter().any(|w| w.handle() == handle) {
            return Err(Error::unknown_window(handle));
        }
        registry.active = Some(handle.to_string());
        debug!(window = %handle, "switched window");
        Ok(())
    }

    /// Close a window by handle. Closing the active window promotes the
    /// oldest surviving window; closing the last one leaves the session
    /// without an active window.
    pub fn close_window(&self, handle: &str) -> Result<()> {
        let window = {
            let mut registry = self.lock_registry()?;
            let position = registry
                .windows
                .iter()
                .position(|w| w.handle() == handle)
                .ok_or_else(|| Error::unknown_window(handle))?;
            let window = registry.windows.remove(position);
            if registry.active.as_deref() == Some(handle) {
                registry.active = registry.windows.first().map(|w| w.handle().to_string());
            }
            window
        };

        let view = window.view_id();
        self.executor.run(move |engine, _| {
            engine.dispose_view(view);
            Ok(())
        })?;
        info!(window = %handle, "window closed");
        Ok(())
    }

    /// Close the active window
    pub fn close_active(&self) -> Result<()> {
        let handle = self.active_window()?.handle().to_string();
        self.close_window(&handle)
    }

    /// Reset the session: abandon any in-flight load, drop every window,
    /// install the new timeout generation and init script, and open one
    /// fresh window.
    pub fn reset(&self, timeouts: Timeouts, init_script: Option<String>) -> Result<Arc<Window>> {
        if let Ok(window) = self.active_window() {
            let view = window.view_id();
            self.executor.run(move |engine, _| {
                if let Some(view) = engine.view(view) {
                    view.cancel_load();
                }
                Ok(())
            })?;
        }

        let windows = {
            let mut registry = self.lock_registry()?;
            registry.active = None;
            std::mem::take(&mut registry.windows)
        };
        for window in &windows {
            window.signal().reset();
        }
        let views: Vec<_> = windows.iter().map(|w| w.view_id()).collect();
        self.executor.run(move |engine, _| {
            for view in views {
                engine.dispose_view(view);
            }
            Ok(())
        })?;

        self.set_timeouts(timeouts);
        *self
            .init_script
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))? = init_script;
        info!("session reset");
        self.create_window()
    }

    fn lock_registry(&self) -> Result<std::sync::MutexGuard<'_, Registry>> {
        self.registry
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))
    }
}
