use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use shared::protocol::{ChatMessage, ChatState};
use tokio::{sync::watch, time::sleep};

use crate::{
    backend::{ChatBackend, UploadFile, UploadProgress},
    context::ChatContext,
    error::ChatError,
    view::{MemoryView, Views},
    ClientTimings,
};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Accept,
    Reject(u16, Option<String>),
    Unauthorized,
    Transport,
}

impl Reply {
    fn into_result(self) -> Result<(), ChatError> {
        match self {
            Reply::Accept => Ok(()),
            Reply::Reject(status, message) => Err(ChatError::Api { status, message }),
            Reply::Unauthorized => Err(ChatError::Unauthorized {
                message: Some("Not logged in".to_string()),
            }),
            Reply::Transport => Err(ChatError::Transport("connection reset".to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum FetchReply {
    State(ChatState),
    Delayed(Duration, ChatState),
    Unauthorized,
    Unavailable,
}

#[derive(Default)]
struct FakeState {
    fetch_replies: VecDeque<FetchReply>,
    current: ChatState,
    fetches: usize,
    login_reply: Option<Reply>,
    logins: Vec<String>,
    logout_reply: Option<Reply>,
    logouts: usize,
    send_reply: Option<Reply>,
    sends: Vec<String>,
    upload_reply: Option<Reply>,
    uploads: Vec<String>,
}

/// Scripted stand-in for the chat server.
#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
    upload_steps: u64,
    upload_step_delay: Duration,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            upload_steps: 4,
            upload_step_delay: Duration::from_millis(100),
            ..Self::default()
        })
    }

    pub fn with_state(state: ChatState) -> Arc<Self> {
        let backend = Self::new();
        backend.state.lock().expect("fake lock").current = state;
        backend
    }

    pub fn set_state(&self, state: ChatState) {
        self.state.lock().expect("fake lock").current = state;
    }

    pub fn push_fetch(&self, reply: FetchReply) {
        self.state
            .lock()
            .expect("fake lock")
            .fetch_replies
            .push_back(reply);
    }

    pub fn set_login_reply(&self, reply: Reply) {
        self.state.lock().expect("fake lock").login_reply = Some(reply);
    }

    pub fn set_logout_reply(&self, reply: Reply) {
        self.state.lock().expect("fake lock").logout_reply = Some(reply);
    }

    pub fn set_send_reply(&self, reply: Reply) {
        self.state.lock().expect("fake lock").send_reply = Some(reply);
    }

    pub fn set_upload_reply(&self, reply: Reply) {
        self.state.lock().expect("fake lock").upload_reply = Some(reply);
    }

    pub fn fetches(&self) -> usize {
        self.state.lock().expect("fake lock").fetches
    }

    pub fn logins(&self) -> Vec<String> {
        self.state.lock().expect("fake lock").logins.clone()
    }

    pub fn logouts(&self) -> usize {
        self.state.lock().expect("fake lock").logouts
    }

    pub fn sends(&self) -> Vec<String> {
        self.state.lock().expect("fake lock").sends.clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.state.lock().expect("fake lock").uploads.clone()
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn login(&self, username: &str) -> Result<(), ChatError> {
        let reply = {
            let mut state = self.state.lock().expect("fake lock");
            state.logins.push(username.to_string());
            state.login_reply.clone().unwrap_or(Reply::Accept)
        };
        reply.into_result()
    }

    async fn logout(&self) -> Result<(), ChatError> {
        let reply = {
            let mut state = self.state.lock().expect("fake lock");
            state.logouts += 1;
            state.logout_reply.clone().unwrap_or(Reply::Accept)
        };
        reply.into_result()
    }

    async fn send(&self, message: &str) -> Result<(), ChatError> {
        let reply = {
            let mut state = self.state.lock().expect("fake lock");
            state.sends.push(message.to_string());
            state.send_reply.clone().unwrap_or(Reply::Accept)
        };
        reply.into_result()
    }

    async fn fetch_state(&self) -> Result<ChatState, ChatError> {
        let reply = {
            let mut state = self.state.lock().expect("fake lock");
            state.fetches += 1;
            state
                .fetch_replies
                .pop_front()
                .unwrap_or_else(|| FetchReply::State(state.current.clone()))
        };
        match reply {
            FetchReply::State(state) => Ok(state),
            FetchReply::Delayed(delay, state) => {
                sleep(delay).await;
                Ok(state)
            }
            FetchReply::Unauthorized => Err(ChatError::Unauthorized {
                message: Some("Not logged in".to_string()),
            }),
            FetchReply::Unavailable => Err(ChatError::Api {
                status: 503,
                message: None,
            }),
        }
    }

    async fn upload(
        &self,
        file: UploadFile,
        progress: watch::Sender<UploadProgress>,
    ) -> Result<(), ChatError> {
        let reply = {
            let mut state = self.state.lock().expect("fake lock");
            state.uploads.push(file.name.clone());
            state.upload_reply.clone().unwrap_or(Reply::Accept)
        };

        let total = file.len();
        for step in 0..=self.upload_steps {
            progress.send_replace(UploadProgress {
                bytes_sent: total * step / self.upload_steps,
                bytes_total: Some(total),
            });
            sleep(self.upload_step_delay).await;
        }
        reply.into_result()?;

        let mut state = self.state.lock().expect("fake lock");
        let link = format!(
            r#"📎 <a href="/uploads/{0}" target="_blank">{0}</a>"#,
            file.name
        );
        state
            .current
            .messages
            .push(ChatMessage::new("alice", link, "12:00:01"));
        Ok(())
    }
}

pub(crate) fn message(username: &str, content: &str) -> ChatMessage {
    ChatMessage::new(username, content, "12:00:00")
}

pub(crate) fn snapshot(messages: Vec<ChatMessage>, users: &[&str]) -> ChatState {
    ChatState {
        messages,
        users: users.iter().map(|user| user.to_string()).collect(),
    }
}

pub(crate) fn context(backend: Arc<FakeBackend>) -> (Arc<ChatContext>, Arc<MemoryView>) {
    let view = MemoryView::new();
    let ctx = Arc::new(ChatContext::new(
        backend,
        Views::shared(Arc::clone(&view)),
        ClientTimings::default(),
    ));
    (ctx, view)
}
