//! Client side of a polling group chat: keeps a local view of the shared
//! transcript in step with the server, renders it safely, uploads files with
//! progress and warns about inactivity before the server drops the session.

use std::time::Duration;

pub mod activity;
pub mod backend;
mod context;
pub mod error;
pub mod overlay;
pub mod render;
pub mod session;
pub mod sync;
pub mod upload;
pub mod view;

pub use activity::{ActivityMonitor, ActivityState};
pub use backend::{ChatBackend, HttpChatBackend, UploadFile, UploadProgress};
pub use error::ChatError;
pub use overlay::{MediaOverlay, OverlayClick};
pub use render::{render_message, RenderedMessage, RenderedUser, SafeMarkup};
pub use session::{SessionController, SubmitOutcome};
pub use sync::{RefreshOutcome, SyncLoop};
pub use upload::{UploadHandle, UploadStatus, UploadTask};
pub use view::{ChromeView, MemoryView, TranscriptView, UserListView, Views};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_UPLOAD_GRACE: Duration = Duration::from_secs(1);
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(5);

/// Cadences and delays of the client's timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimings {
    pub poll_interval: Duration,
    pub activity_check_interval: Duration,
    pub inactivity_warning_after: Duration,
    /// How long the progress bar stays after a successful upload.
    pub upload_grace: Duration,
    pub notice_ttl: Duration,
}

impl Default for ClientTimings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            activity_check_interval: activity::ACTIVITY_CHECK_INTERVAL,
            inactivity_warning_after: activity::INACTIVITY_WARNING_AFTER,
            upload_grace: DEFAULT_UPLOAD_GRACE,
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
