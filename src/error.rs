//! Error types for memotrack

use thiserror::Error;

/// Main error type for memotrack
#[derive(Debug, Error)]
pub enum MemoTrackError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No app mode selected")]
    ModeNotSelected,

    #[error("Memo not found: {0}")]
    MemoNotFound(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("{0}")]
    Validation(String),

    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Background task failed: {0}")]
    Background(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl MemoTrackError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MemoTrackError::Config(_) => 2,
            MemoTrackError::ModeNotSelected => 3,
            MemoTrackError::MemoNotFound(_) => 4,
            _ => 1,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn display_with_suggestions(&self) -> String {
        match self {
            MemoTrackError::ModeNotSelected => "No app mode selected\n\n\
                Suggestions:\n\
                • Run 'memotrack mode demo' to explore with sample data\n\
                • Run 'memotrack mode offline' to keep memos on this machine\n\
                • Run 'memotrack login --host <URL> --token <TOKEN>' to use a memos server"
                .to_string(),
            MemoTrackError::InvalidCredentials(msg) => {
                format!(
                    "Invalid credentials: {}\n\n\
                    Suggestions:\n\
                    • Check that the host URL includes the scheme (https://...)\n\
                    • Create a new access token in the server settings\n\
                    • Run 'memotrack login --host <URL> --token <TOKEN>' again",
                    msg
                )
            }
            MemoTrackError::InvalidRange(msg) => {
                format!(
                    "Invalid range: {}\n\n\
                    Valid ranges: week, month, quarter, year\n\
                    Example: memotrack habits --range month --offset -1",
                    msg
                )
            }
            MemoTrackError::Config(msg) => {
                if msg.contains("Invalid mode") {
                    format!(
                        "{}\n\n\
                        Valid modes: online, offline, demo\n\
                        Example: memotrack mode offline",
                        msg
                    )
                } else if msg.contains("date format") {
                    format!(
                        "{}\n\n\
                        Expected format: YYYY-MM-DD\n\
                        Example: memotrack check 2025-01-17 exercise",
                        msg
                    )
                } else {
                    msg.clone()
                }
            }
            _ => self.to_string(),
        }
    }
}

/// Result type using MemoTrackError
pub type Result<T> = std::result::Result<T, MemoTrackError>;
