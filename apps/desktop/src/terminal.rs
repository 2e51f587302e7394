//! Line-oriented rendering of the chat for a terminal.
//!
//! The transcript arrives as full snapshots; only entries not already printed
//! are written. Server text is stripped of control characters before printing.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use client_core::{
    overlay::MediaOverlay,
    render::{is_media_bearing, MediaRef},
    view::{IndicatorId, ProgressDisplay},
    ChromeView, HttpChatBackend, RenderedMessage, RenderedUser, TranscriptView, UserListView,
};
use shared::{domain::SessionViewState, protocol::ChatMessage};

#[derive(Debug, Default)]
struct TerminalState {
    shown: Vec<ChatMessage>,
    media: Vec<MediaRef>,
    users: Vec<String>,
    progress: HashMap<IndicatorId, String>,
}

pub struct TerminalView {
    backend: Arc<HttpChatBackend>,
    state: Mutex<TerminalState>,
}

impl TerminalView {
    pub fn new(backend: Arc<HttpChatBackend>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            state: Mutex::new(TerminalState::default()),
        })
    }

    /// Media linked from the current transcript, numbered from 1 as printed.
    pub fn media(&self, number: usize) -> Option<MediaRef> {
        let index = number.checked_sub(1)?;
        self.lock().media.get(index).cloned()
    }

    /// Absolute form of a transcript link; the raw link if it cannot be resolved.
    pub fn resolve(&self, link: &str) -> String {
        self.backend
            .resolve_url(link)
            .map(String::from)
            .unwrap_or_else(|_| link.to_string())
    }

    fn lock(&self) -> MutexGuard<'_, TerminalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn sanitize(text: &str) -> String {
    text.chars().filter(|ch| !ch.is_control()).collect()
}

/// Index of the first entry of `incoming` not yet printed, or `None` when the
/// server history no longer extends what was shown.
pub(crate) fn unseen_from(shown: &[ChatMessage], incoming: &[ChatMessage]) -> Option<usize> {
    incoming.starts_with(shown).then_some(shown.len())
}

pub(crate) fn format_line(message: &RenderedMessage, media_number: Option<usize>) -> String {
    let source = &message.source;
    let body = match (&message.media, media_number) {
        (Some(media), Some(number)) => format!(
            "[{} #{number}] {}",
            media.kind.as_str(),
            sanitize(&media.label)
        ),
        _ if is_media_bearing(&source.content) => "[attachment unavailable]".to_string(),
        _ => sanitize(&source.content),
    };
    format!(
        "[{}] {}: {body}",
        sanitize(&source.timestamp),
        sanitize(&source.username)
    )
}

impl TranscriptView for TerminalView {
    fn render(&self, messages: &[RenderedMessage]) {
        let mut state = self.lock();
        let incoming: Vec<ChatMessage> = messages.iter().map(|m| m.source.clone()).collect();
        let start = unseen_from(&state.shown, &incoming).unwrap_or_else(|| {
            println!("-- transcript reloaded --");
            0
        });

        state.media.clear();
        for (index, message) in messages.iter().enumerate() {
            let number = message.media.as_ref().map(|media| {
                state.media.push(media.clone());
                state.media.len()
            });
            if index >= start {
                println!("{}", format_line(message, number));
            }
        }
        state.shown = incoming;
    }

    fn append(&self, message: RenderedMessage) {
        println!("{}", format_line(&message, None));
    }

    fn clear(&self) {
        let mut state = self.lock();
        state.shown.clear();
        state.media.clear();
    }

    fn scroll_to_latest(&self) {}
}

impl UserListView for TerminalView {
    fn render(&self, users: &[RenderedUser]) {
        let names: Vec<String> = users.iter().map(|user| sanitize(&user.username)).collect();
        let mut state = self.lock();
        if state.users != names {
            println!("Online ({}): {}", names.len(), names.join(", "));
            state.users = names;
        }
    }

    fn clear(&self) {
        self.lock().users.clear();
    }
}

impl ChromeView for TerminalView {
    fn show_region(&self, state: SessionViewState) {
        match state {
            SessionViewState::LoggedIn => println!("Joined the chat. Type a message or /help."),
            SessionViewState::LoggedOut => println!("Not logged in. Use /login <name>."),
        }
    }

    fn set_message_input_enabled(&self, enabled: bool) {
        if !enabled {
            println!("(messages paused until the upload finishes)");
        }
    }

    // Typed lines are consumed on read; nothing to reset.
    fn clear_message_input(&self) {}
    fn clear_username_input(&self) {}
    fn clear_file_selection(&self) {}

    fn alert(&self, message: &str) {
        eprintln!("! {}", sanitize(message));
    }

    fn show_progress(&self, id: IndicatorId, progress: &ProgressDisplay) {
        let line = format!(
            "{} {:>3.0}% {}",
            sanitize(&progress.file_name),
            progress.percent,
            progress.status_line
        );
        let mut state = self.lock();
        if state.progress.get(&id) != Some(&line) {
            println!("{line}");
            state.progress.insert(id, line);
        }
    }

    fn remove_progress(&self, id: IndicatorId) {
        self.lock().progress.remove(&id);
    }

    fn show_notice(&self, _id: IndicatorId, message: &str) {
        eprintln!("! {}", sanitize(message));
    }

    fn dismiss_notice(&self, _id: IndicatorId) {}

    fn show_overlay(&self, overlay: &MediaOverlay) {
        println!(
            "Preview ({}): {}",
            overlay.kind().as_str(),
            self.resolve(overlay.url())
        );
    }

    fn dismiss_overlay(&self) {
        println!("Preview closed");
    }
}

#[cfg(test)]
#[path = "tests/terminal_tests.rs"]
mod tests;
