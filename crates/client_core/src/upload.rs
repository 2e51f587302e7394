//! Single-file upload with progress reporting and message-input locking.

use std::sync::Arc;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::sleep,
};
use tokio_stream::wrappers::WatchStream;
use tracing::{error, info, warn};

use crate::{
    backend::{UploadFile, UploadProgress},
    context::ChatContext,
    error::ChatError,
    sync::SyncLoop,
    view::{IndicatorId, ProgressDisplay},
};

const UPLOAD_FAILED: &str = "Upload failed";
const UPLOAD_TRANSPORT_FAILED: &str = "Error while uploading the file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    InProgress,
    Done,
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadTask {
    pub file_name: String,
    pub bytes_sent: u64,
    pub bytes_total: Option<u64>,
    pub status: UploadStatus,
    /// Message shown to the user when the upload failed.
    pub error: Option<String>,
}

impl UploadTask {
    fn pending(file: &UploadFile) -> Self {
        Self {
            file_name: file.name.clone(),
            bytes_sent: 0,
            bytes_total: Some(file.len()),
            status: UploadStatus::Pending,
            error: None,
        }
    }

    pub fn percent(&self) -> Option<f64> {
        UploadProgress {
            bytes_sent: self.bytes_sent,
            bytes_total: self.bytes_total,
        }
        .percent()
    }
}

/// Observes one upload. Dropping it does not cancel the transfer.
pub struct UploadHandle {
    task: watch::Receiver<UploadTask>,
    driver: JoinHandle<()>,
}

impl UploadHandle {
    pub fn current(&self) -> UploadTask {
        self.task.borrow().clone()
    }

    /// Every state change of the task, starting with the current one.
    pub fn progress(&self) -> WatchStream<UploadTask> {
        WatchStream::new(self.task.clone())
    }

    /// Waits for the terminal status. Does not wait for the indicator's grace delay.
    pub async fn finish(mut self) -> UploadStatus {
        let terminal = match self.task.wait_for(|task| task.status.is_terminal()).await {
            Ok(task) => Some(task.status),
            Err(_) => None,
        };
        terminal.unwrap_or_else(|| self.task.borrow().status)
    }

    /// Waits until the transient UI of this upload is gone as well.
    pub async fn settled(self) -> UploadStatus {
        if let Err(err) = self.driver.await {
            warn!("upload driver ended abnormally: {err}");
        }
        self.task.borrow().status
    }
}

pub struct Uploader {
    ctx: Arc<ChatContext>,
    sync: Arc<SyncLoop>,
}

impl Uploader {
    pub(crate) fn new(ctx: Arc<ChatContext>, sync: Arc<SyncLoop>) -> Self {
        Self { ctx, sync }
    }

    /// Locks the message input, shows a progress indicator and starts the transfer.
    /// Rejected while another upload is in flight.
    pub async fn upload(&self, file: UploadFile) -> Result<UploadHandle, ChatError> {
        let indicator = {
            let mut state = self.ctx.state.lock().await;
            if state.upload_in_flight {
                return Err(ChatError::InvalidState("an upload is already in progress"));
            }
            state.upload_in_flight = true;
            state.next_indicator()
        };

        let chrome = &self.ctx.views.chrome;
        chrome.set_message_input_enabled(false);
        chrome.show_progress(
            indicator,
            &ProgressDisplay {
                file_name: file.name.clone(),
                percent: 0.0,
                status_line: format!("Uploading: {}", file.name),
            },
        );

        let (task_tx, task_rx) = watch::channel(UploadTask::pending(&file));
        let driver = UploadDriver {
            ctx: Arc::clone(&self.ctx),
            sync: Arc::clone(&self.sync),
            indicator,
            task: task_tx,
        };
        info!(file = %file.name, bytes = file.len(), "upload started");
        let driver = tokio::spawn(driver.run(file));
        Ok(UploadHandle {
            task: task_rx,
            driver,
        })
    }
}

struct UploadDriver {
    ctx: Arc<ChatContext>,
    sync: Arc<SyncLoop>,
    indicator: IndicatorId,
    task: watch::Sender<UploadTask>,
}

impl UploadDriver {
    async fn run(self, file: UploadFile) {
        let (progress_tx, mut progress_rx) = watch::channel(UploadProgress::default());
        let backend = Arc::clone(&self.ctx.backend);
        let mut transfer = tokio::spawn(async move { backend.upload(file, progress_tx).await });

        let mut progress_open = true;
        let joined = loop {
            tokio::select! {
                biased;
                changed = progress_rx.changed(), if progress_open => match changed {
                    Ok(()) => {
                        let progress = *progress_rx.borrow_and_update();
                        self.on_progress(progress);
                    }
                    Err(_) => progress_open = false,
                },
                joined = &mut transfer => break joined,
            }
        };
        let last = *progress_rx.borrow();
        self.on_progress(last);

        let result = joined.unwrap_or_else(|err| {
            error!("upload task ended unexpectedly: {err}");
            Err(ChatError::Transport(format!("upload task ended unexpectedly: {err}")))
        });
        match result {
            Ok(()) => self.on_success().await,
            Err(err) => self.on_failure(err).await,
        }
    }

    /// Applies a transport progress report. Reports that would move the bar
    /// backwards are ignored.
    fn on_progress(&self, progress: UploadProgress) {
        let mut changed = None;
        self.task.send_if_modified(|task| {
            if task.status.is_terminal() || progress.bytes_sent < task.bytes_sent {
                return false;
            }
            let modified = task.status != UploadStatus::InProgress
                || progress.bytes_sent != task.bytes_sent
                || progress.bytes_total != task.bytes_total;
            task.status = UploadStatus::InProgress;
            task.bytes_sent = progress.bytes_sent;
            if progress.bytes_total.is_some() {
                task.bytes_total = progress.bytes_total;
            }
            if modified {
                changed = Some(task.clone());
            }
            modified
        });

        let Some(task) = changed else {
            return;
        };
        let Some(percent) = task.percent() else {
            return;
        };
        self.ctx.views.chrome.show_progress(
            self.indicator,
            &ProgressDisplay {
                file_name: task.file_name.clone(),
                percent,
                status_line: format!("Uploading: {}%", percent.round() as u64),
            },
        );
    }

    async fn on_success(self) {
        let file_name = self.task.borrow().file_name.clone();
        info!(file = %file_name, "upload finished");

        let chrome = &self.ctx.views.chrome;
        chrome.clear_file_selection();
        chrome.set_message_input_enabled(true);
        self.ctx.state.lock().await.upload_in_flight = false;
        self.sync.refresh().await;

        self.task.send_modify(|task| {
            task.status = UploadStatus::Done;
            if let Some(total) = task.bytes_total {
                task.bytes_sent = total;
            }
        });

        // Keep the bar up until the new media message has been painted.
        sleep(self.ctx.timings.upload_grace).await;
        self.ctx.views.chrome.remove_progress(self.indicator);
    }

    async fn on_failure(self, err: ChatError) {
        let fallback = if err.is_transport() {
            UPLOAD_TRANSPORT_FAILED
        } else {
            UPLOAD_FAILED
        };
        let message = err.user_message(fallback);
        warn!("upload failed: {err}");

        let chrome = &self.ctx.views.chrome;
        chrome.remove_progress(self.indicator);
        let notice = self.ctx.state.lock().await.next_indicator();
        chrome.show_notice(notice, &message);
        chrome.set_message_input_enabled(true);
        self.ctx.state.lock().await.upload_in_flight = false;

        self.task.send_modify(|task| {
            task.status = UploadStatus::Failed;
            task.error = Some(message);
        });

        sleep(self.ctx.timings.notice_ttl).await;
        self.ctx.views.chrome.dismiss_notice(notice);
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
