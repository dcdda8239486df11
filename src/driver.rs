//! Driver command surface
//!
//! The blocking facade over one engine instance. Every command marshals onto
//! the engine thread through the executor; commands that read page state
//! first wait out any in-flight load so they never observe a half-loaded
//! document.

use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use tracing::{debug, info};

use crate::config::{Settings, Timeouts};
use crate::engine::executor::EngineThreadExecutor;
use crate::engine::traits::{Engine, View};
use crate::session::context::Context;
use crate::session::navigation::NavigationController;
use crate::timezone::TimezoneScripts;
use crate::{Error, Result};

pub struct Driver<E: Engine> {
    settings: RwLock<Settings>,
    factory: Arc<dyn Fn() -> E + Send + Sync>,
    context: Mutex<Option<Arc<Context<E>>>>,
    timezone_scripts: TimezoneScripts,
}

impl<E: Engine> Driver<E> {
    /// Create a driver; the engine itself starts lazily on first use.
    /// `factory` runs once on the engine thread to build the engine value.
    pub fn new<F>(settings: Settings, factory: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        Self {
            settings: RwLock::new(settings),
            factory: Arc::new(factory),
            context: Mutex::new(None),
            timezone_scripts: TimezoneScripts::new(),
        }
    }

    /// Start the engine and open the first window. Idempotent.
    pub fn init(&self) -> Result<()> {
        self.context().map(|_| ())
    }

    /// Navigate the active window and block until the load settles or the
    /// page-load budget runs out. Returns the HTTP status code; failed loads
    /// report a negative code instead of an error.
    pub fn get(&self, url: &str) -> Result<i32> {
        let context = self.context()?;
        info!(url = %url, "navigating");
        let code = self.navigator(&context)?.navigate(url)?;
        debug!(url = %url, code, "navigation complete");
        Ok(code)
    }

    /// Status code of the most recent load, waiting out a pending one under
    /// the page-load budget. Reports 0 when still pending at the deadline.
    pub fn status_code(&self) -> Result<i32> {
        let context = self.context()?;
        self.navigator(&context)?.status_code()
    }

    /// Block until any in-flight load settles; cancels it at the deadline.
    pub fn page_wait(&self) -> Result<i32> {
        let context = self.context()?;
        self.navigator(&context)?.wait_for_pending()
    }

    /// URL of the document in the active window
    pub fn current_url(&self) -> Result<String> {
        let context = self.context()?;
        self.navigator(&context)?.wait_for_pending()?;
        let view_id = context.active_window()?.view_id();
        context.executor().run(move |engine, _| {
            let view = engine
                .view(view_id)
                .ok_or_else(|| Error::internal("view disposed"))?;
            Ok(view.location())
        })
    }

    /// Title of the document in the active window
    pub fn title(&self) -> Result<String> {
        let context = self.context()?;
        self.navigator(&context)?.wait_for_pending()?;
        let view_id = context.active_window()?.view_id();
        context.executor().run(move |engine, _| {
            let view = engine
                .view(view_id)
                .ok_or_else(|| Error::internal("view disposed"))?;
            Ok(view.title())
        })
    }

    /// Serialized source of the active document.
    ///
    /// Tries progressively cruder renderings: live outer HTML prefixed with
    /// the serialized doctype, then the engine's own HTML snapshot, then a
    /// DOM serialization, and finally the document's text content. Callers
    /// always get some rendition of the page.
    pub fn page_source(&self) -> Result<String> {
        let context = self.context()?;
        self.navigator(&context)?.wait_for_pending()?;
        let view_id = context.active_window()?.view_id();
        context.executor().run(move |engine, _| {
            let view = engine
                .view(view_id)
                .ok_or_else(|| Error::internal("view disposed"))?;

            if let Some(outer) = view.outer_html().filter(|html| !html.is_empty()) {
                let doctype = match view.eval(
                    "document.doctype ? new XMLSerializer().serializeToString(document.doctype) : ''",
                ) {
                    Ok(Value::String(doctype)) => doctype,
                    Ok(_) => String::new(),
                    Err(e) => {
                        debug!(error = %e, "doctype serialization failed");
                        String::new()
                    }
                };
                return Ok(if doctype.is_empty() {
                    outer
                } else {
                    format!("{}\n{}", doctype, outer)
                });
            }

            if let Some(html) = view.html_snapshot() {
                debug!("page source from engine html snapshot");
                return Ok(html);
            }
            if let Some(xml) = view.document_xml() {
                debug!("page source from dom serialization");
                return Ok(xml);
            }
            debug!("page source degraded to text content");
            Ok(view.inner_text())
        })
    }

    /// Evaluate a script in the active document under the script budget
    pub fn execute_script(&self, script: &str) -> Result<Value> {
        self.eval(script)
    }

    /// Evaluate an async script; the page resolves it through its callback
    /// argument, the engine binding turns that into the returned value.
    pub fn execute_async_script(&self, script: &str) -> Result<Value> {
        self.eval(script)
    }

    /// PNG screenshot of the active window
    pub fn screenshot(&self) -> Result<Vec<u8>> {
        let context = self.context()?;
        self.navigator(&context)?.wait_for_pending()?;
        let view_id = context.active_window()?.view_id();
        context.executor().run(move |engine, _| {
            let view = engine
                .view(view_id)
                .ok_or_else(|| Error::internal("view disposed"))?;
            view.screenshot()
        })
    }

    /// Handle of the active window
    pub fn window_handle(&self) -> Result<String> {
        Ok(self.context()?.active_window()?.handle().to_string())
    }

    /// Handles of all open windows, oldest first
    pub fn window_handles(&self) -> Result<Vec<String>> {
        self.context()?.window_handles()
    }

    /// Open a new window and return its handle; the active window is
    /// unchanged.
    pub fn new_window(&self) -> Result<String> {
        Ok(self.context()?.create_window()?.handle().to_string())
    }

    /// Make the given window active
    pub fn switch_window(&self, handle: &str) -> Result<()> {
        self.context()?.switch_window(handle)
    }

    /// Close the active window
    pub fn close(&self) -> Result<()> {
        self.context()?.close_active()
    }

    /// Current timeout generation
    pub fn timeouts(&self) -> Result<Timeouts> {
        Ok(*self.context()?.timeouts())
    }

    /// Install a new timeout generation; in-flight waits keep the budget
    /// they started with.
    pub fn set_timeouts(&self, timeouts: Timeouts) -> Result<()> {
        self.settings
            .write()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .timeouts = timeouts;
        self.context()?.set_timeouts(timeouts);
        Ok(())
    }

    /// Capability metadata negotiated for this session
    pub fn capabilities(&self) -> Result<Option<Value>> {
        Ok(self.context()?.capabilities())
    }

    pub fn store_capabilities(&self, capabilities: Value) -> Result<()> {
        self.context()?.store_capabilities(capabilities);
        Ok(())
    }

    /// Reset the session in place: abandon any in-flight load, drop every
    /// window, apply the new settings, and open one fresh window. The engine
    /// keeps running.
    pub fn reset(&self, settings: Option<Settings>) -> Result<()> {
        let settings = {
            let mut current = self
                .settings
                .write()
                .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
            if let Some(settings) = settings {
                *current = settings;
            }
            current.clone()
        };

        let init_script = self.init_script(&settings)?;
        self.context()?.reset(settings.timeouts, init_script)?;
        Ok(())
    }

    /// Shut the engine down. Blocks until the engine thread has drained its
    /// queue and exited. Idempotent.
    pub fn quit(&self) -> Result<()> {
        let context = self
            .context
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .take();
        if let Some(context) = context {
            // Let a settled load report before teardown; a still-pending one
            // is abandoned with the session.
            if let Ok(navigator) = self.navigator(&context) {
                let _ = navigator.status_code();
            }
            info!("session quit");
        }
        Ok(())
    }

    fn eval(&self, script: &str) -> Result<Value> {
        let context = self.context()?;
        self.navigator(&context)?.wait_for_pending()?;
        let view_id = context.active_window()?.view_id();
        let script = script.to_string();
        let script_ms = context.timeouts().script_ms;
        context.executor().run_timeout(script_ms, move |engine, _| {
            let view = engine
                .view(view_id)
                .ok_or_else(|| Error::internal("view disposed"))?;
            view.eval(&script)
        })
    }

    fn navigator(&self, context: &Arc<Context<E>>) -> Result<NavigationController<E>> {
        Ok(NavigationController::new(
            context.executor().clone(),
            context.active_window()?,
            context.timeouts().page_load_ms,
        ))
    }

    fn init_script(&self, settings: &Settings) -> Result<Option<String>> {
        settings
            .timezone
            .as_deref()
            .map(|id| {
                self.timezone_scripts
                    .script_for(id)
                    .map(|script| script.to_string())
            })
            .transpose()
    }

    fn context(&self) -> Result<Arc<Context<E>>> {
        let mut slot = self
            .context
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        if let Some(context) = slot.as_ref() {
            return Ok(context.clone());
        }

        let settings = self
            .settings
            .read()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .clone();
        let init_script = self.init_script(&settings)?;

        let factory = self.factory.clone();
        let executor = Arc::new(EngineThreadExecutor::spawn(move || factory())?);
        let context = Arc::new(Context::new(executor, settings.timeouts, init_script));
        context.create_window()?;
        info!("engine started");

        *slot = Some(context.clone());
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{LoadPlan, LoadPlans, MockEngine, SourceAvailability};
    use std::time::Duration;

    fn driver_with(plans: LoadPlans) -> Driver<MockEngine> {
        Driver::new(Settings::default(), move || MockEngine::new(plans.clone()))
    }

    #[test]
    fn test_get_reports_status_and_page_state() {
        let plans = LoadPlans::new();
        plans.set(
            "http://example.test/",
            LoadPlan::ok(200).with_content("Example", "<html><body>hi</body></html>"),
        );
        let driver = driver_with(plans);

        assert_eq!(driver.get("http://example.test/").unwrap(), 200);
        assert_eq!(driver.current_url().unwrap(), "http://example.test/");
        assert_eq!(driver.title().unwrap(), "Example");
    }

    #[test]
    fn test_page_source_prepends_doctype() {
        let plans = LoadPlans::new();
        plans.set(
            "http://example.test/",
            LoadPlan::ok(200).with_content("Example", "<html><body>hi</body></html>"),
        );
        let driver = driver_with(plans);
        driver.get("http://example.test/").unwrap();

        assert_eq!(
            driver.page_source().unwrap(),
            "<!DOCTYPE html>\n<html><body>hi</body></html>"
        );
    }

    #[test]
    fn test_page_source_falls_back_to_snapshot() {
        let plans = LoadPlans::new();
        plans.set(
            "http://example.test/",
            LoadPlan::ok(200).with_content("Example", "<html></html>"),
        );
        let sources = SourceAvailability {
            outer_html: false,
            snapshot: true,
            dom_serialize: true,
        };
        let driver = Driver::new(Settings::default(), move || {
            MockEngine::new(plans.clone()).with_sources(sources)
        });
        driver.get("http://example.test/").unwrap();

        assert_eq!(driver.page_source().unwrap(), "snapshot:<html></html>");
    }

    #[test]
    fn test_execute_script_surfaces_page_errors() {
        let driver = driver_with(LoadPlans::new());
        driver.get("http://example.test/").unwrap();

        assert!(driver.execute_script("return 1 + 1;").is_ok());
        assert!(matches!(
            driver.execute_script("throw new Error('boom');"),
            Err(Error::ScriptExecution(_))
        ));
    }

    #[test]
    fn test_timezone_script_injected_into_new_windows() {
        let settings = Settings {
            timezone: Some("UTC".to_string()),
            ..Settings::default()
        };
        let plans = LoadPlans::new();
        let driver = Driver::new(settings, move || MockEngine::new(plans.clone()));
        driver.init().unwrap();

        let context = driver.context().unwrap();
        let view_id = context.active_window().unwrap().view_id();
        let injected = context
            .executor()
            .run(move |engine, _| {
                Ok(engine
                    .view(view_id)
                    .map(|view| view.injected.clone())
                    .unwrap_or_default())
            })
            .unwrap();

        assert_eq!(injected.len(), 1);
        assert!(injected[0].contains("Date.prototype.getTimezoneOffset"));
        assert!(injected[0].contains("var isDaylightSavings = false;"));
    }

    #[test]
    fn test_reset_drops_extra_windows_and_applies_settings() {
        let driver = driver_with(LoadPlans::new());
        driver.init().unwrap();
        driver.new_window().unwrap();
        driver.new_window().unwrap();
        assert_eq!(driver.window_handles().unwrap().len(), 3);

        let settings = Settings {
            timeouts: Timeouts {
                page_load_ms: 1234,
                ..Timeouts::default()
            },
            ..Settings::default()
        };
        driver.reset(Some(settings)).unwrap();

        assert_eq!(driver.window_handles().unwrap().len(), 1);
        assert_eq!(driver.timeouts().unwrap().page_load_ms, 1234);
        // The fresh window is usable immediately
        assert_eq!(driver.get("http://example.test/").unwrap(), 200);
    }

    #[test]
    fn test_set_timeouts_applies_to_later_navigations() {
        let plans = LoadPlans::new();
        plans.set("http://hang.test/", LoadPlan::Hang);
        let driver = driver_with(plans);
        driver.init().unwrap();

        driver
            .set_timeouts(Timeouts {
                page_load_ms: 150,
                ..Timeouts::default()
            })
            .unwrap();

        assert!(matches!(
            driver.get("http://hang.test/"),
            Err(Error::NavigationTimeout { timeout_ms: 150 })
        ));
    }

    #[test]
    fn test_quit_is_idempotent() {
        let plans = LoadPlans::new();
        plans.set(
            "http://example.test/",
            LoadPlan::ok_after(200, Duration::from_millis(20)),
        );
        let driver = driver_with(plans);
        driver.get("http://example.test/").unwrap();

        driver.quit().unwrap();
        driver.quit().unwrap();
    }
}
