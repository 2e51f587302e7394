//! Login/logout transitions and the user actions that feed the server.

use std::sync::Arc;

use shared::domain::{MediaKind, SessionViewState};
use tokio::{sync::Mutex, task::JoinHandle, time::Instant};
use tracing::{info, warn};

use crate::{
    activity::{spawn_activity_watch, ActivityState},
    backend::{ChatBackend, UploadFile},
    context::ChatContext,
    error::ChatError,
    overlay::{MediaOverlay, OverlayClick},
    sync::{RefreshOutcome, SyncLoop},
    upload::{UploadHandle, Uploader},
    view::Views,
    ClientTimings,
};

const LOGIN_FAILED: &str = "Login failed";
const SERVER_UNREACHABLE: &str = "Could not reach the server";
const SEND_FAILED: &str = "Message could not be sent";
const LOGOUT_FAILED: &str = "Logout failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing typed and no file selected.
    Empty,
    Sent,
    /// A file is selected; the upload path owns this submission.
    AwaitingUpload,
}

pub struct SessionController {
    ctx: Arc<ChatContext>,
    sync: Arc<SyncLoop>,
    uploader: Uploader,
    activity_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        views: Views,
        timings: ClientTimings,
    ) -> Arc<Self> {
        let ctx = Arc::new(ChatContext::new(backend, views, timings));
        let sync = SyncLoop::new(Arc::clone(&ctx));
        let uploader = Uploader::new(Arc::clone(&ctx), Arc::clone(&sync));
        Arc::new(Self {
            ctx,
            sync,
            uploader,
            activity_task: Mutex::new(None),
        })
    }

    /// Shows the login region and starts the inactivity check.
    pub async fn start(&self) {
        self.ctx
            .views
            .chrome
            .show_region(self.view_state().await);
        let mut task = self.activity_task.lock().await;
        if task.is_none() {
            *task = Some(spawn_activity_watch(Arc::clone(&self.ctx)));
        }
    }

    /// Stops every background task owned by the client.
    pub async fn shutdown(&self) {
        self.sync.stop().await;
        if let Some(task) = self.activity_task.lock().await.take() {
            task.abort();
        }
    }

    pub async fn view_state(&self) -> SessionViewState {
        self.ctx.state.lock().await.view
    }

    pub async fn username(&self) -> Option<String> {
        self.ctx.state.lock().await.username.clone()
    }

    pub async fn activity_state(&self) -> ActivityState {
        self.ctx.state.lock().await.activity.state()
    }

    pub fn sync_loop(&self) -> &Arc<SyncLoop> {
        &self.sync
    }

    pub async fn login(&self, username: &str) -> Result<(), ChatError> {
        if self.view_state().await.is_logged_in() {
            return Err(ChatError::InvalidState("already logged in"));
        }

        let username = username.trim();
        let chrome = &self.ctx.views.chrome;
        if let Err(err) = self.ctx.backend.login(username).await {
            warn!(username, "login failed: {err}");
            if err.is_transport() {
                chrome.alert(SERVER_UNREACHABLE);
            } else {
                chrome.alert(&err.user_message(LOGIN_FAILED));
                chrome.clear_username_input();
            }
            return Err(err);
        }

        {
            let mut state = self.ctx.state.lock().await;
            state.view = SessionViewState::LoggedIn;
            state.username = Some(username.to_string());
        }
        info!(username, "logged in");
        chrome.show_region(SessionViewState::LoggedIn);
        self.sync.start().await;
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), ChatError> {
        if let Err(err) = self.ctx.backend.logout().await {
            warn!("logout failed: {err}");
            if err.is_transport() {
                self.ctx.views.chrome.alert(LOGOUT_FAILED);
            }
            return Err(err);
        }

        self.sync.stop().await;
        let username = {
            let mut state = self.ctx.state.lock().await;
            state.view = SessionViewState::LoggedOut;
            state.username.take()
        };
        info!(username = ?username, "logged out");
        let views = &self.ctx.views;
        views.chrome.show_region(SessionViewState::LoggedOut);
        views.transcript.clear();
        views.users.clear();
        Ok(())
    }

    /// Sends typed text. Blank text with no file selected is ignored.
    pub async fn submit_message(&self, text: &str) -> Result<SubmitOutcome, ChatError> {
        let text = text.trim();
        let file_selected = self.ctx.state.lock().await.upload_in_flight;
        if file_selected {
            return Ok(SubmitOutcome::AwaitingUpload);
        }
        if text.is_empty() {
            return Ok(SubmitOutcome::Empty);
        }

        if let Err(err) = self.ctx.backend.send(text).await {
            warn!("send failed: {err}");
            self.ctx.views.chrome.alert(&err.user_message(SEND_FAILED));
            return Err(err);
        }

        self.ctx
            .state
            .lock()
            .await
            .activity
            .record_activity(Instant::now());
        self.ctx.views.chrome.clear_message_input();
        self.sync.refresh().await;
        Ok(SubmitOutcome::Sent)
    }

    /// Starts uploading a newly selected file.
    pub async fn select_file(&self, file: UploadFile) -> Result<UploadHandle, ChatError> {
        self.uploader.upload(file).await
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        self.sync.refresh().await
    }

    /// Opens the preview overlay, replacing any open one. Returns false for
    /// kinds without a preview.
    pub async fn open_media(&self, url: &str, kind: MediaKind) -> bool {
        let overlay: Option<MediaOverlay> = self
            .ctx
            .state
            .lock()
            .await
            .overlay
            .show(url, kind)
            .cloned();
        match overlay {
            Some(overlay) => {
                self.ctx.views.chrome.show_overlay(&overlay);
                true
            }
            None => false,
        }
    }

    /// Routes a click on the open overlay. Returns true when it was dismissed.
    pub async fn overlay_clicked(&self, target: OverlayClick) -> bool {
        let dismissed = self.ctx.state.lock().await.overlay.click(target);
        if dismissed {
            self.ctx.views.chrome.dismiss_overlay();
        }
        dismissed
    }

    pub async fn current_overlay(&self) -> Option<MediaOverlay> {
        self.ctx.state.lock().await.overlay.current().cloned()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
