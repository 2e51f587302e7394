//! Display surfaces the session logic writes to.
//!
//! Calls are synchronous and made from the client's async tasks; implementations
//! must not block on I/O for long.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::domain::SessionViewState;

use crate::{
    overlay::MediaOverlay,
    render::{RenderedMessage, RenderedUser},
};

/// Identifies a transient element (progress bar or notice) until it is removed.
pub type IndicatorId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressDisplay {
    pub file_name: String,
    pub percent: f64,
    pub status_line: String,
}

pub trait TranscriptView: Send + Sync {
    /// Replaces the whole transcript.
    fn render(&self, messages: &[RenderedMessage]);
    fn append(&self, message: RenderedMessage);
    fn clear(&self);
    fn scroll_to_latest(&self);
}

pub trait UserListView: Send + Sync {
    fn render(&self, users: &[RenderedUser]);
    fn clear(&self);
}

/// Everything around the transcript: region switching, inputs and transient UI.
pub trait ChromeView: Send + Sync {
    fn show_region(&self, state: SessionViewState);
    fn set_message_input_enabled(&self, enabled: bool);
    fn clear_message_input(&self);
    fn clear_username_input(&self);
    fn clear_file_selection(&self);
    fn alert(&self, message: &str);
    fn show_progress(&self, id: IndicatorId, progress: &ProgressDisplay);
    fn remove_progress(&self, id: IndicatorId);
    fn show_notice(&self, id: IndicatorId, message: &str);
    fn dismiss_notice(&self, id: IndicatorId);
    fn show_overlay(&self, overlay: &MediaOverlay);
    fn dismiss_overlay(&self);
}

#[derive(Clone)]
pub struct Views {
    pub transcript: Arc<dyn TranscriptView>,
    pub users: Arc<dyn UserListView>,
    pub chrome: Arc<dyn ChromeView>,
}

impl Views {
    /// Uses one object for all three surfaces.
    pub fn shared<V>(view: Arc<V>) -> Self
    where
        V: TranscriptView + UserListView + ChromeView + 'static,
    {
        Self {
            transcript: view.clone(),
            users: view.clone(),
            chrome: view,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryViewState {
    pub region: SessionViewState,
    pub transcript: Vec<RenderedMessage>,
    pub users: Vec<RenderedUser>,
    pub transcript_renders: usize,
    pub scrolls: usize,
    pub message_input_enabled: bool,
    /// Every enable/disable call in order.
    pub message_input_history: Vec<bool>,
    pub message_input_clears: usize,
    pub username_input_clears: usize,
    pub file_selection_clears: usize,
    pub alerts: Vec<String>,
    /// Progress updates per indicator, oldest first.
    pub progress: BTreeMap<IndicatorId, Vec<ProgressDisplay>>,
    pub removed_progress: Vec<IndicatorId>,
    pub notices: BTreeMap<IndicatorId, String>,
    pub dismissed_notices: Vec<IndicatorId>,
    pub overlay: Option<MediaOverlay>,
}

impl Default for MemoryViewState {
    fn default() -> Self {
        Self {
            region: SessionViewState::LoggedOut,
            transcript: Vec::new(),
            users: Vec::new(),
            transcript_renders: 0,
            scrolls: 0,
            message_input_enabled: true,
            message_input_history: Vec::new(),
            message_input_clears: 0,
            username_input_clears: 0,
            file_selection_clears: 0,
            alerts: Vec::new(),
            progress: BTreeMap::new(),
            removed_progress: Vec::new(),
            notices: BTreeMap::new(),
            dismissed_notices: Vec::new(),
            overlay: None,
        }
    }
}

impl MemoryViewState {
    pub fn visible_progress(&self) -> Vec<IndicatorId> {
        self.progress
            .keys()
            .filter(|id| !self.removed_progress.contains(id))
            .copied()
            .collect()
    }

    pub fn visible_notices(&self) -> Vec<&str> {
        self.notices
            .iter()
            .filter(|(id, _)| !self.dismissed_notices.contains(id))
            .map(|(_, message)| message.as_str())
            .collect()
    }
}

/// Records what would have been displayed. Used headless and in tests.
#[derive(Debug, Default)]
pub struct MemoryView {
    state: Mutex<MemoryViewState>,
}

impl MemoryView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> MemoryViewState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TranscriptView for MemoryView {
    fn render(&self, messages: &[RenderedMessage]) {
        let mut state = self.lock();
        state.transcript = messages.to_vec();
        state.transcript_renders += 1;
    }

    fn append(&self, message: RenderedMessage) {
        self.lock().transcript.push(message);
    }

    fn clear(&self) {
        self.lock().transcript.clear();
    }

    fn scroll_to_latest(&self) {
        self.lock().scrolls += 1;
    }
}

impl UserListView for MemoryView {
    fn render(&self, users: &[RenderedUser]) {
        self.lock().users = users.to_vec();
    }

    fn clear(&self) {
        self.lock().users.clear();
    }
}

impl ChromeView for MemoryView {
    fn show_region(&self, region: SessionViewState) {
        self.lock().region = region;
    }

    fn set_message_input_enabled(&self, enabled: bool) {
        let mut state = self.lock();
        state.message_input_enabled = enabled;
        state.message_input_history.push(enabled);
    }

    fn clear_message_input(&self) {
        self.lock().message_input_clears += 1;
    }

    fn clear_username_input(&self) {
        self.lock().username_input_clears += 1;
    }

    fn clear_file_selection(&self) {
        self.lock().file_selection_clears += 1;
    }

    fn alert(&self, message: &str) {
        self.lock().alerts.push(message.to_string());
    }

    fn show_progress(&self, id: IndicatorId, progress: &ProgressDisplay) {
        self.lock()
            .progress
            .entry(id)
            .or_default()
            .push(progress.clone());
    }

    fn remove_progress(&self, id: IndicatorId) {
        self.lock().removed_progress.push(id);
    }

    fn show_notice(&self, id: IndicatorId, message: &str) {
        self.lock().notices.insert(id, message.to_string());
    }

    fn dismiss_notice(&self, id: IndicatorId) {
        self.lock().dismissed_notices.push(id);
    }

    fn show_overlay(&self, overlay: &MediaOverlay) {
        self.lock().overlay = Some(overlay.clone());
    }

    fn dismiss_overlay(&self) {
        self.lock().overlay = None;
    }
}
