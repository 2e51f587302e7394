use serde::{Deserialize, Serialize};

/// Which region of the client is active. Also decides whether polling runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionViewState {
    #[default]
    LoggedOut,
    LoggedIn,
}

impl SessionViewState {
    pub fn is_logged_in(self) -> bool {
        self == Self::LoggedIn
    }
}

/// Kind of media a message links to, derived from the linked file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    File,
}

impl MediaKind {
    const IMAGE_EXTENSIONS: [&'static str; 4] = ["jpg", "jpeg", "png", "gif"];
    const VIDEO_EXTENSIONS: [&'static str; 4] = ["mp4", "mov", "avi", "webm"];

    /// Classifies a lowercase extension. Every input maps to exactly one kind.
    pub fn from_extension(extension: &str) -> Self {
        if Self::IMAGE_EXTENSIONS.contains(&extension) {
            Self::Image
        } else if Self::VIDEO_EXTENSIONS.contains(&extension) {
            Self::Video
        } else {
            Self::File
        }
    }

    /// Classifies a file name by its last dot-separated segment, ignoring case.
    pub fn from_filename(filename: &str) -> Self {
        Self::from_extension(&file_extension(filename))
    }

    /// Whether the overlay can preview this kind.
    pub fn previewable(self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::File => "file",
        }
    }
}

/// Lowercased text after the last `.`; the whole name when there is no dot.
pub fn file_extension(filename: &str) -> String {
    filename
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}
