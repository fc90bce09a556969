//! Gemini extraction error types.

use thiserror::Error;

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Errors that can occur while extracting a recipe from a video.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The model judged the video not to be about cooking.
    #[error("not_a_recipe")]
    NotARecipe,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gemini API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Remote file processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Timed out after {waited_secs}s waiting for remote file {name}")]
    Timeout { name: String, waited_secs: u64 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create an error from a non-success HTTP response.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP status associated with the error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ExtractError::Api { status, .. } => Some(*status),
            ExtractError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
