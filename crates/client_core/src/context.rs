use std::sync::Arc;

use shared::domain::SessionViewState;
use tokio::{sync::Mutex, time::Instant};
use tracing::info;

use crate::{
    activity::ActivityMonitor, backend::ChatBackend, overlay::OverlaySlot, view::IndicatorId,
    view::Views, ClientTimings,
};

/// State shared by the sync loop, the uploader and the session controller.
pub(crate) struct ChatContext {
    pub backend: Arc<dyn ChatBackend>,
    pub views: Views,
    pub timings: ClientTimings,
    pub state: Mutex<ClientState>,
}

pub(crate) struct ClientState {
    pub view: SessionViewState,
    pub username: Option<String>,
    pub activity: ActivityMonitor,
    pub overlay: OverlaySlot,
    pub upload_in_flight: bool,
    next_indicator: IndicatorId,
}

impl ClientState {
    pub fn next_indicator(&mut self) -> IndicatorId {
        self.next_indicator += 1;
        self.next_indicator
    }
}

impl ChatContext {
    pub fn new(backend: Arc<dyn ChatBackend>, views: Views, timings: ClientTimings) -> Self {
        let activity = ActivityMonitor::new(Instant::now(), timings.inactivity_warning_after);
        Self {
            backend,
            views,
            timings,
            state: Mutex::new(ClientState {
                view: SessionViewState::LoggedOut,
                username: None,
                activity,
                overlay: OverlaySlot::default(),
                upload_in_flight: false,
                next_indicator: 0,
            }),
        }
    }

    /// Server ended the session: back to the login region.
    pub async fn expire_session(&self) {
        let username = {
            let mut state = self.state.lock().await;
            state.view = SessionViewState::LoggedOut;
            state.username.take()
        };
        info!(username = ?username, "session expired on server, returning to login");
        self.views.users.clear();
        self.views.chrome.show_region(SessionViewState::LoggedOut);
    }
}
