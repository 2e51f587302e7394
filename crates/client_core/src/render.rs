//! Turns transcript records into display markup.
//!
//! Message content is either plain text, which is always escaped, or a single
//! embedded anchor produced by the upload endpoint, which is rebuilt from the
//! extracted link and label rather than passed through.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use shared::{domain::MediaKind, protocol::ChatMessage};
use thiserror::Error;
use tracing::warn;
use url::Url;

const ANCHOR_MARKER: &str = "<a href=";
const RENDER_ERROR_PLACEHOLDER: &str =
    r#"<span class="render-error">[attachment unavailable]</span>"#;

static HREF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).expect("valid href regex"));
static LABEL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">([^<]+)</a>").expect("valid anchor label regex"));

/// Markup built only from escaped text and fixed templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeMarkup(String);

impl SafeMarkup {
    fn from_trusted(markup: String) -> Self {
        Self(markup)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SafeMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("media reference has no href attribute")]
    MissingHref,
    #[error("media reference has no link label")]
    MissingLabel,
    #[error("media reference points at a non-http url: {0}")]
    UnsafeHref(String),
}

/// An uploaded file referenced from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub url: String,
    pub label: String,
    pub kind: MediaKind,
}

/// How a message's content is to be displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Plain(String),
    Media(MediaRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub source: ChatMessage,
    pub markup: SafeMarkup,
    /// Set when the content was a well-formed media reference.
    pub media: Option<MediaRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedUser {
    pub username: String,
    pub markup: SafeMarkup,
}

/// Escapes the five HTML metacharacters in one pass.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn is_media_bearing(content: &str) -> bool {
    content.contains(ANCHOR_MARKER)
}

pub fn extract_media(content: &str) -> Result<MediaRef, RenderError> {
    let url = HREF_PATTERN
        .captures(content)
        .and_then(|captures| captures.get(1))
        .ok_or(RenderError::MissingHref)?
        .as_str()
        .to_string();
    ensure_http_link(&url)?;
    let label = LABEL_PATTERN
        .captures(content)
        .and_then(|captures| captures.get(1))
        .ok_or(RenderError::MissingLabel)?
        .as_str()
        .to_string();
    let kind = MediaKind::from_filename(&label);
    Ok(MediaRef { url, label, kind })
}

/// Accepts relative links and absolute http(s) ones only.
fn ensure_http_link(url: &str) -> Result<(), RenderError> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(()),
        _ => Err(RenderError::UnsafeHref(url.to_string())),
    }
}

pub fn classify(content: &str) -> Result<MessageBody, RenderError> {
    if is_media_bearing(content) {
        extract_media(content).map(MessageBody::Media)
    } else {
        Ok(MessageBody::Plain(content.to_string()))
    }
}

fn render_media(media: &MediaRef) -> String {
    let url = escape_html(&media.url);
    let label = escape_html(&media.label);
    match media.kind {
        MediaKind::Image => format!(
            r##"<a href="#" class="media-link" data-media-url="{url}" data-media-kind="image"><img src="{url}" class="chat-thumbnail" alt="{label}"></a>"##
        ),
        MediaKind::Video => format!(
            r##"<a href="#" class="media-link" data-media-url="{url}" data-media-kind="video"><div class="video-thumbnail"><i class="bi bi-play-circle"></i><span>{label}</span></div></a>"##
        ),
        MediaKind::File => {
            format!(r#"<a href="{url}" target="_blank" download>📎 {label}</a>"#)
        }
    }
}

/// Renders one transcript entry. A malformed media reference only degrades
/// this entry to a placeholder.
pub fn render_message(message: &ChatMessage) -> RenderedMessage {
    let (content, media) = match classify(&message.content) {
        Ok(MessageBody::Plain(text)) => (escape_html(&text), None),
        Ok(MessageBody::Media(media)) => (render_media(&media), Some(media)),
        Err(err) => {
            warn!(
                username = %message.username,
                timestamp = %message.timestamp,
                "failed to render media message: {err}"
            );
            (RENDER_ERROR_PLACEHOLDER.to_string(), None)
        }
    };

    let markup = format!(
        r#"<div class="message"><span class="timestamp">[{}]</span> <span class="username">{}:</span> <span class="content">{content}</span></div>"#,
        escape_html(&message.timestamp),
        escape_html(&message.username),
    );
    RenderedMessage {
        source: message.clone(),
        markup: SafeMarkup::from_trusted(markup),
        media,
    }
}

pub fn render_transcript(messages: &[ChatMessage]) -> Vec<RenderedMessage> {
    messages.iter().map(render_message).collect()
}

pub fn render_user(username: &str) -> RenderedUser {
    let markup = format!(
        r#"<li class="list-group-item"><i class="bi bi-person-fill"></i> {}</li>"#,
        escape_html(username)
    );
    RenderedUser {
        username: username.to_string(),
        markup: SafeMarkup::from_trusted(markup),
    }
}

pub fn render_users(users: &[String]) -> Vec<RenderedUser> {
    users.iter().map(|user| render_user(user)).collect()
}

pub(crate) fn trusted_markup(markup: String) -> SafeMarkup {
    SafeMarkup::from_trusted(markup)
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
