//! Engine abstraction traits
//!
//! The embedded rendering engine sits behind these interfaces so the driver
//! core can run against the in-process mock as well as a real engine binding.
//! Engine values are confined to the engine thread; callers never touch them
//! directly and all access is marshalled through the executor.

use serde_json::Value;

use crate::session::load::LoadObserver;
use crate::Result;

/// Opaque identifier of one engine view. Only meaningful on the engine thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(pub(crate) u64);

/// Load-state callbacks delivered by the engine for one view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadEvent {
    /// A navigation began
    Started,
    /// The load finished; `status` carries the HTTP status when known
    Succeeded { status: Option<i32> },
    /// The load failed
    Failed,
    /// The load was abandoned on request
    Cancelled,
}

/// The embedded rendering engine instance
///
/// There is exactly one per executor; it is created on the engine thread and
/// never leaves it, so implementations do not need to be `Send`.
pub trait Engine: 'static {
    type View: View;

    /// Create a new view wired to the given load observer
    fn create_view(&mut self, observer: LoadObserver) -> ViewId;

    /// Destroy a view and release its resources
    fn dispose_view(&mut self, id: ViewId);

    /// Access a live view
    fn view(&mut self, id: ViewId) -> Option<&mut Self::View>;
}

/// One navigation context's view within the engine
pub trait View {
    /// Begin loading the given URL. Completion is reported through the
    /// load observer, never synchronously to the caller.
    fn load(&mut self, url: &str);

    /// Ask the engine to abandon the in-flight load. Cooperative: the
    /// engine may deliver a `Cancelled` event later, or nothing at all.
    fn cancel_load(&mut self);

    /// Current document location
    fn location(&self) -> String;

    /// Current document title
    fn title(&self) -> String;

    /// Serialized outer HTML of the document element, if available
    fn outer_html(&self) -> Option<String>;

    /// Engine-level HTML snapshot of the main frame
    fn html_snapshot(&self) -> Option<String>;

    /// Full-document serialization through the DOM
    fn document_xml(&self) -> Option<String>;

    /// Plain-text extraction of the main frame
    fn inner_text(&self) -> String;

    /// Evaluate script text in the page context
    fn eval(&mut self, script: &str) -> Result<Value>;

    /// Register script text evaluated before page scripts on every load
    fn set_init_script(&mut self, script: String);

    /// Capture the view as encoded image bytes
    fn screenshot(&mut self) -> Result<Vec<u8>>;
}
