//! Full-size preview of an image or video linked from the transcript.

use shared::domain::{file_extension, MediaKind};

use crate::render::{escape_html, trusted_markup, SafeMarkup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaOverlay {
    url: String,
    kind: MediaKind,
}

impl MediaOverlay {
    /// `None` for kinds that have no preview; those are plain downloads.
    pub fn new(url: impl Into<String>, kind: MediaKind) -> Option<Self> {
        kind.previewable().then(|| Self {
            url: url.into(),
            kind,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Format hint for the video source, taken from the url's trailing extension.
    pub fn video_source_type(&self) -> Option<String> {
        (self.kind == MediaKind::Video).then(|| format!("video/{}", file_extension(&self.url)))
    }

    pub fn markup(&self) -> SafeMarkup {
        let url = escape_html(&self.url);
        let content = match self.video_source_type() {
            Some(source_type) => format!(
                r#"<video controls class="popup-content"><source src="{url}" type="{}"></video>"#,
                escape_html(&source_type)
            ),
            None => format!(r#"<img src="{url}" class="popup-content">"#),
        };
        trusted_markup(format!(r#"<div class="media-popup">{content}</div>"#))
    }
}

/// Where a click on an open overlay landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayClick {
    Background,
    Media,
}

/// Holds at most one overlay; showing another replaces it.
#[derive(Debug, Default)]
pub struct OverlaySlot {
    current: Option<MediaOverlay>,
}

impl OverlaySlot {
    pub fn show(&mut self, url: &str, kind: MediaKind) -> Option<&MediaOverlay> {
        let overlay = MediaOverlay::new(url, kind)?;
        Some(self.current.insert(overlay))
    }

    /// Returns true when the click dismissed the overlay.
    pub fn click(&mut self, target: OverlayClick) -> bool {
        match target {
            OverlayClick::Background => self.current.take().is_some(),
            OverlayClick::Media => false,
        }
    }

    pub fn dismiss(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn current(&self) -> Option<&MediaOverlay> {
        self.current.as_ref()
    }
}
