//! Advisory inactivity warning. The server enforces the real timeout; this
//! only nudges the user before it hits.

use std::{sync::Arc, time::Duration};

use shared::protocol::ChatMessage;
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::{context::ChatContext, render::render_message};

pub const INACTIVITY_WARNING_AFTER: Duration = Duration::from_secs(15 * 60);
pub const ACTIVITY_CHECK_INTERVAL: Duration = Duration::from_secs(60);

const WARNING_AUTHOR: &str = "System";
const WARNING_TEXT: &str = "⚠️ The server will pause after 20 minutes of inactivity. Send a message to keep the connection active.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    Fresh,
    /// A warning went out and no send has happened since.
    Warned,
}

#[derive(Debug, Clone)]
pub struct ActivityMonitor {
    last_activity: Instant,
    warned: bool,
    threshold: Duration,
}

impl ActivityMonitor {
    pub fn new(now: Instant, threshold: Duration) -> Self {
        Self {
            last_activity: now,
            warned: false,
            threshold,
        }
    }

    /// Called after every successful outbound message.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
        self.warned = false;
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    pub fn state(&self) -> ActivityState {
        if self.warned {
            ActivityState::Warned
        } else {
            ActivityState::Fresh
        }
    }

    /// Emits a warning once the idle time reaches the threshold and restarts the
    /// countdown, so a silent user gets one warning per threshold period.
    pub fn check(&mut self, now: Instant) -> Option<ChatMessage> {
        if self.idle_for(now) < self.threshold {
            return None;
        }
        self.last_activity = now;
        self.warned = true;
        Some(inactivity_warning(
            chrono::Local::now().format("%H:%M:%S").to_string(),
        ))
    }
}

pub fn inactivity_warning(timestamp: impl Into<String>) -> ChatMessage {
    ChatMessage::new(WARNING_AUTHOR, WARNING_TEXT, timestamp)
}

/// Runs the periodic check for the lifetime of the client, appending warnings
/// to the transcript.
pub(crate) fn spawn_activity_watch(ctx: Arc<ChatContext>) -> JoinHandle<()> {
    let every = ctx.timings.activity_check_interval;
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let warning = ctx.state.lock().await.activity.check(Instant::now());
            match warning {
                Some(warning) => {
                    info!("inactivity threshold reached, warning user");
                    ctx.views.transcript.append(render_message(&warning));
                }
                None => debug!("activity check passed"),
            }
        }
    })
}

#[cfg(test)]
#[path = "tests/activity_tests.rs"]
mod tests;
