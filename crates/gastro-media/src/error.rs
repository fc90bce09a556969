//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while acquiring or cleaning up media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("yt-dlp not found: {0}")]
    YtDlpNotFound(String),

    #[error("Download failed: {message}")]
    DownloadFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
            stderr: None,
            exit_code: None,
        }
    }

    /// Full diagnostic text, including captured stderr when available.
    pub fn details(&self) -> String {
        match self {
            MediaError::DownloadFailed {
                message,
                stderr: Some(stderr),
                ..
            } => format!("{}\n{}", message, stderr),
            other => other.to_string(),
        }
    }
}
