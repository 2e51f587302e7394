//! HTTP contract of the chat server, behind a trait so the session logic can be
//! exercised without a network.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use futures::stream;
use reqwest::{
    multipart::{Form, Part},
    Body, Client, Response, StatusCode,
};
use shared::protocol::{ApiErrorBody, ChatState, LoginForm, SendMessageForm, UPLOAD_FIELD};
use tokio::sync::watch;
use tracing::debug;
use url::Url;

use crate::error::ChatError;

const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ChatError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or(ChatError::InvalidState("upload path has no file name"))?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { name, bytes })
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Transfer progress as reported by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub bytes_total: Option<u64>,
}

impl UploadProgress {
    /// `bytes_sent / bytes_total * 100`, only when the total is known.
    pub fn percent(&self) -> Option<f64> {
        match self.bytes_total {
            Some(0) => Some(100.0),
            Some(total) => Some((self.bytes_sent.min(total) as f64 / total as f64) * 100.0),
            None => None,
        }
    }
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn login(&self, username: &str) -> Result<(), ChatError>;
    async fn logout(&self) -> Result<(), ChatError>;
    async fn send(&self, message: &str) -> Result<(), ChatError>;
    async fn fetch_state(&self) -> Result<ChatState, ChatError>;
    /// Streams `file` to the server, publishing progress on `progress`.
    async fn upload(
        &self,
        file: UploadFile,
        progress: watch::Sender<UploadProgress>,
    ) -> Result<(), ChatError>;
}

pub struct HttpChatBackend {
    http: Client,
    server_url: String,
}

impl HttpChatBackend {
    pub fn new(server_url: impl Into<String>) -> Result<Self, ChatError> {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Url::parse(&server_url)
            .map_err(|err| ChatError::InvalidUrl(format!("server url '{server_url}': {err}")))?;
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self { http, server_url })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Resolves a link found in a message (usually `/uploads/<name>`) against the server.
    pub fn resolve_url(&self, reference: &str) -> Result<Url, ChatError> {
        let base = Url::parse(&format!("{}/", self.server_url))
            .map_err(|err| ChatError::InvalidUrl(err.to_string()))?;
        base.join(reference)
            .map_err(|err| ChatError::Decode(format!("invalid media link '{reference}': {err}")))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }
}

/// Passes 2xx responses through and turns everything else into a typed error,
/// keeping the server's `{error}` text when the body carries one.
async fn check_status(response: Response) -> Result<Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ApiErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error);
    if status == StatusCode::UNAUTHORIZED {
        return Err(ChatError::Unauthorized { message });
    }
    Err(ChatError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn login(&self, username: &str) -> Result<(), ChatError> {
        let response = self
            .http
            .post(self.endpoint("/login"))
            .form(&LoginForm {
                username: username.to_string(),
            })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn logout(&self) -> Result<(), ChatError> {
        let response = self.http.post(self.endpoint("/logout")).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn send(&self, message: &str) -> Result<(), ChatError> {
        let response = self
            .http
            .post(self.endpoint("/send"))
            .form(&SendMessageForm {
                message: message.to_string(),
            })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn fetch_state(&self) -> Result<ChatState, ChatError> {
        let response = self.http.get(self.endpoint("/messages")).send().await?;
        let state = check_status(response)
            .await?
            .json::<ChatState>()
            .await
            .map_err(|err| ChatError::Decode(err.to_string()))?;
        Ok(state)
    }

    async fn upload(
        &self,
        file: UploadFile,
        progress: watch::Sender<UploadProgress>,
    ) -> Result<(), ChatError> {
        let total = file.len();
        let progress = Arc::new(progress);
        progress.send_replace(UploadProgress {
            bytes_sent: 0,
            bytes_total: Some(total),
        });

        let chunks: Vec<Vec<u8>> = file
            .bytes
            .chunks(UPLOAD_CHUNK_BYTES)
            .map(<[u8]>::to_vec)
            .collect();
        let chunk_progress = Arc::clone(&progress);
        let mut sent = 0_u64;
        let body = Body::wrap_stream(stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            chunk_progress.send_replace(UploadProgress {
                bytes_sent: sent,
                bytes_total: Some(total),
            });
            Ok::<_, std::io::Error>(chunk)
        })));

        let mime = mime_guess::from_path(&file.name).first_or_octet_stream();
        let part = Part::stream_with_length(body, total)
            .file_name(file.name.clone())
            .mime_str(mime.essence_str())?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        debug!(file = %file.name, bytes = total, "starting upload");
        let response = self
            .http
            .post(self.endpoint("/upload"))
            .multipart(form)
            .send()
            .await?;
        check_status(response).await?;

        progress.send_replace(UploadProgress {
            bytes_sent: total,
            bytes_total: Some(total),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
