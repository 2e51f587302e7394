use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One transcript entry as served by `/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub username: String,
    /// Either free text or a single embedded anchor pointing at an upload.
    #[serde(rename = "message")]
    pub content: String,
    /// Server formatted, displayed verbatim.
    pub timestamp: String,
}

impl ChatMessage {
    pub fn new(
        username: impl Into<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// Full snapshot returned by one poll. Replaces the local state wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatState {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub users: Vec<String>,
}

impl ChatState {
    /// Online users with duplicates removed, in stable order.
    pub fn unique_users(&self) -> Vec<String> {
        self.users
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginForm {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageForm {
    pub message: String,
}

/// Failure payload of every endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Multipart field name the upload endpoint reads the file from.
pub const UPLOAD_FIELD: &str = "file";
