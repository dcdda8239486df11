//! In-process mock engine
//!
//! A scriptable stand-in for a real engine binding: per-URL load plans with
//! configurable delays and outcomes, asynchronous load events, cooperative
//! cancellation, and recorded init scripts. The whole test suite runs
//! against it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

use crate::engine::traits::{Engine, LoadEvent, View, ViewId};
use crate::session::load::LoadObserver;
use crate::{Error, Result};

/// Planned outcome for one URL
#[derive(Debug, Clone)]
pub enum LoadPlan {
    /// Complete with the given HTTP status after the delay
    Succeed {
        status: i32,
        delay: Duration,
        title: String,
        html: String,
    },
    /// Fail after the delay
    Fail { delay: Duration },
    /// Never settle; only a cancel ends it
    Hang,
}

impl LoadPlan {
    pub fn ok(status: i32) -> Self {
        LoadPlan::Succeed {
            status,
            delay: Duration::ZERO,
            title: String::new(),
            html: String::new(),
        }
    }

    pub fn ok_after(status: i32, delay: Duration) -> Self {
        LoadPlan::Succeed {
            status,
            delay,
            title: String::new(),
            html: String::new(),
        }
    }

    pub fn with_content(mut self, title: &str, html: &str) -> Self {
        if let LoadPlan::Succeed {
            title: t, html: h, ..
        } = &mut self
        {
            *t = title.to_string();
            *h = html.to_string();
        }
        self
    }
}

/// Shared per-URL plans; clone one handle into the engine factory and keep
/// another to steer the test.
#[derive(Debug, Clone, Default)]
pub struct LoadPlans(Arc<Mutex<HashMap<String, LoadPlan>>>);

impl LoadPlans {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, url: &str, plan: LoadPlan) {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), plan);
    }

    fn get(&self, url: &str) -> LoadPlan {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned()
            .unwrap_or_else(|| LoadPlan::ok(200))
    }
}

/// Which page-source strategies the mock view pretends to support
#[derive(Debug, Clone, Copy)]
pub struct SourceAvailability {
    pub outer_html: bool,
    pub snapshot: bool,
    pub dom_serialize: bool,
}

impl Default for SourceAvailability {
    fn default() -> Self {
        Self {
            outer_html: true,
            snapshot: true,
            dom_serialize: true,
        }
    }
}

#[derive(Debug, Default)]
struct ViewState {
    url: String,
    title: String,
    html: String,
}

/// Mock engine owning all mock views
pub struct MockEngine {
    plans: LoadPlans,
    sources: SourceAvailability,
    views: HashMap<ViewId, MockView>,
    next_view: u64,
}

impl MockEngine {
    pub fn new(plans: LoadPlans) -> Self {
        Self {
            plans,
            sources: SourceAvailability::default(),
            views: HashMap::new(),
            next_view: 0,
        }
    }

    pub fn with_sources(mut self, sources: SourceAvailability) -> Self {
        self.sources = sources;
        self
    }
}

impl Engine for MockEngine {
    type View = MockView;

    fn create_view(&mut self, observer: LoadObserver) -> ViewId {
        let id = ViewId(self.next_view);
        self.next_view += 1;
        self.views
            .insert(id, MockView::new(observer, self.plans.clone(), self.sources));
        id
    }

    fn dispose_view(&mut self, id: ViewId) {
        self.views.remove(&id);
    }

    fn view(&mut self, id: ViewId) -> Option<&mut MockView> {
        self.views.get_mut(&id)
    }
}

/// One mock view; load events fire from a timer thread like a real engine
/// delivers them from its network pipeline.
pub struct MockView {
    observer: LoadObserver,
    plans: LoadPlans,
    sources: SourceAvailability,
    state: Arc<Mutex<ViewState>>,
    /// Bumped on every load and cancel; stale timer threads compare it and
    /// drop their event instead of resolving an abandoned navigation.
    generation: Arc<AtomicU64>,
    /// Init scripts registered through `set_init_script`
    pub injected: Vec<String>,
}

impl MockView {
    fn new(observer: LoadObserver, plans: LoadPlans, sources: SourceAvailability) -> Self {
        Self {
            observer,
            plans,
            sources,
            state: Arc::new(Mutex::new(ViewState::default())),
            generation: Arc::new(AtomicU64::new(0)),
            injected: Vec::new(),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl View for MockView {
    fn load(&mut self, url: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.observer.on_event(LoadEvent::Started);

        match self.plans.get(url) {
            LoadPlan::Succeed {
                status,
                delay,
                title,
                html,
            } => {
                let observer = self.observer.clone();
                let state = self.state.clone();
                let gen_cell = self.generation.clone();
                let url = url.to_string();
                let apply = move || {
                    if gen_cell.load(Ordering::SeqCst) != generation {
                        return;
                    }
                    {
                        let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                        state.url = url;
                        state.title = title;
                        state.html = html;
                    }
                    observer.on_event(LoadEvent::Succeeded {
                        status: Some(status),
                    });
                };
                if delay.is_zero() {
                    apply();
                } else {
                    thread::spawn(move || {
                        thread::sleep(delay);
                        apply();
                    });
                }
            }
            LoadPlan::Fail { delay } => {
                let observer = self.observer.clone();
                let gen_cell = self.generation.clone();
                let fire = move || {
                    if gen_cell.load(Ordering::SeqCst) == generation {
                        observer.on_event(LoadEvent::Failed);
                    }
                };
                if delay.is_zero() {
                    fire();
                } else {
                    thread::spawn(move || {
                        thread::sleep(delay);
                        fire();
                    });
                }
            }
            LoadPlan::Hang => {}
        }
    }

    fn cancel_load(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.observer.on_event(LoadEvent::Cancelled);
    }

    fn location(&self) -> String {
        self.state().url.clone()
    }

    fn title(&self) -> String {
        self.state().title.clone()
    }

    fn outer_html(&self) -> Option<String> {
        self.sources.outer_html.then(|| self.state().html.clone())
    }

    fn html_snapshot(&self) -> Option<String> {
        self.sources
            .snapshot
            .then(|| format!("snapshot:{}", self.state().html))
    }

    fn document_xml(&self) -> Option<String> {
        self.sources
            .dom_serialize
            .then(|| format!("xml:{}", self.state().html))
    }

    fn inner_text(&self) -> String {
        format!("text:{}", self.state().html)
    }

    fn eval(&mut self, script: &str) -> Result<Value> {
        if script.contains("throw") {
            return Err(Error::script_execution("mock evaluation threw"));
        }
        if script.contains("document.doctype") {
            return Ok(json!("<!DOCTYPE html>"));
        }
        Ok(json!({ "script": script }))
    }

    fn set_init_script(&mut self, script: String) {
        self.injected.push(script);
    }

    fn screenshot(&mut self) -> Result<Vec<u8>> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}
