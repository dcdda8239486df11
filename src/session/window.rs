//! Window (navigation context) within a session

use std::sync::Arc;

use uuid::Uuid;

use crate::engine::traits::ViewId;
use crate::session::load::LoadStatusSignal;

/// One window: an engine view plus its load signal, addressed by an opaque
/// handle that stays stable for the window's lifetime.
pub struct Window {
    handle: String,
    view: ViewId,
    signal: Arc<LoadStatusSignal>,
}

impl Window {
    pub(crate) fn new(view: ViewId, signal: Arc<LoadStatusSignal>) -> Self {
        Self {
            handle: Uuid::new_v4().to_string(),
            view,
            signal,
        }
    }

    /// Opaque window handle
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// The engine view backing this window
    pub fn view_id(&self) -> ViewId {
        self.view
    }

    /// This window's load signal
    pub fn signal(&self) -> &Arc<LoadStatusSignal> {
        &self.signal
    }
}
