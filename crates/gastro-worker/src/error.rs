//! Pipeline error taxonomy.

use gastro_models::PlatformError;
use gastro_store::StoreError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Outcome of a failed pipeline run.
///
/// Only `RateLimited` and `QuotaExceeded` are transient; every other variant
/// is final for the URL that produced it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] PlatformError),

    #[error("Download failed: {0}")]
    AcquisitionFailed(String),

    #[error("Video is not a food recipe")]
    NotARecipe,

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Extraction failed: {0}")]
    ExtractionOther(String),

    /// The natural key was inserted concurrently; the recipe exists.
    #[error("Recipe already exists: {0}")]
    PersistConflict(String),

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl PipelineError {
    pub fn acquisition_failed(msg: impl Into<String>) -> Self {
        Self::AcquisitionFailed(msg.into())
    }

    pub fn extraction_other(msg: impl Into<String>) -> Self {
        Self::ExtractionOther(msg.into())
    }

    /// Whether the same URL may succeed if retried later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::RateLimited(_) | PipelineError::QuotaExceeded(_)
        )
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidUrl(_) => "invalid_url",
            PipelineError::AcquisitionFailed(_) => "acquisition_failed",
            PipelineError::NotARecipe => "not_a_recipe",
            PipelineError::RateLimited(_) => "rate_limited",
            PipelineError::QuotaExceeded(_) => "quota_exceeded",
            PipelineError::ExtractionOther(_) => "extraction_failed",
            PipelineError::PersistConflict(_) => "persist_conflict",
            PipelineError::Storage(_) => "storage",
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => PipelineError::PersistConflict(msg),
            other => PipelineError::Storage(other),
        }
    }
}
