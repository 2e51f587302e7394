//! Pull-based refresh of the chat snapshot on a fixed cadence.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    context::ChatContext,
    render::{render_transcript, render_users},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Rendered { messages: usize, users: usize },
    /// The server answered 401; polling stopped and the login region is shown.
    SessionExpired,
    /// Transient failure, logged only.
    Failed,
    /// Completed after a newer snapshot was applied or after polling stopped.
    Discarded,
}

pub struct SyncLoop {
    ctx: Arc<ChatContext>,
    handle: Mutex<Option<JoinHandle<()>>>,
    /// Bumped by `stop`; refreshes started under an older epoch are dropped.
    epoch: AtomicU64,
    issued: AtomicU64,
    applied: Mutex<u64>,
}

impl SyncLoop {
    pub(crate) fn new(ctx: Arc<ChatContext>) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            handle: Mutex::new(None),
            epoch: AtomicU64::new(0),
            issued: AtomicU64::new(0),
            applied: Mutex::new(0),
        })
    }

    /// Refreshes immediately, then every poll interval, until stopped.
    pub async fn start(self: &Arc<Self>) {
        let mut handle = self.handle.lock().await;
        if handle.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("sync loop already running");
            return;
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let every = self.ctx.timings.poll_interval;
        let this = Arc::clone(self);
        info!(interval_ms = every.as_millis() as u64, "starting chat polling");
        *handle = Some(tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if this.epoch.load(Ordering::SeqCst) != epoch {
                    break;
                }
                if this.refresh().await == RefreshOutcome::SessionExpired {
                    break;
                }
            }
        }));
    }

    /// Cancels future ticks. A refresh already in flight is discarded when it lands.
    pub async fn stop(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.handle.lock().await.take() {
            task.abort();
            info!("stopped chat polling");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Fetches the snapshot and re-renders transcript and user list from it.
    pub async fn refresh(&self) -> RefreshOutcome {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.ctx.backend.fetch_state().await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(seq, "dropping refresh that completed after polling stopped");
            return RefreshOutcome::Discarded;
        }

        match result {
            Ok(state) => {
                let mut applied = self.applied.lock().await;
                if seq < *applied {
                    debug!(seq, applied = *applied, "dropping stale chat snapshot");
                    return RefreshOutcome::Discarded;
                }
                *applied = seq;

                let messages = render_transcript(&state.messages);
                let users = render_users(&state.unique_users());
                self.ctx.views.transcript.render(&messages);
                self.ctx.views.users.render(&users);
                self.ctx.views.transcript.scroll_to_latest();
                debug!(
                    messages = messages.len(),
                    users = users.len(),
                    "rendered chat snapshot"
                );
                RefreshOutcome::Rendered {
                    messages: messages.len(),
                    users: users.len(),
                }
            }
            Err(err) if err.is_session_expired() => {
                self.ctx.expire_session().await;
                self.stop().await;
                RefreshOutcome::SessionExpired
            }
            Err(err) => {
                warn!("chat refresh failed: {err}");
                RefreshOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
