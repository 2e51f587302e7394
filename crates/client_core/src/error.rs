use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("session expired or not logged in")]
    Unauthorized { message: Option<String> },
    #[error("server rejected request with status {status}: {}", message.as_deref().unwrap_or("no details"))]
    Api {
        status: u16,
        message: Option<String>,
    },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid server payload: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("failed to read upload file: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    InvalidState(&'static str),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl ChatError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Error text the server attached to its response, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message } | Self::Api { message, .. } => message
                .as_deref()
                .map(str::trim)
                .filter(|message| !message.is_empty()),
            _ => None,
        }
    }

    /// Server-provided text verbatim, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
