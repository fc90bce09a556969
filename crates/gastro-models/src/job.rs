//! Processing job definitions for the retry queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Auto-assigned job identifier.
pub type JobId = i64;

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Waiting for its next retry
    #[default]
    Pending,
    /// Being re-driven through the pipeline right now
    Processing,
    /// A recipe exists for the job's URL
    Completed,
    /// Gave up: terminal failure or retry ceiling reached
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(JobStatus::Pending),
            "PROCESSING" => Ok(JobStatus::Processing),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// A queued request to re-run the pipeline for a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub id: JobId,
    pub url: String,
    pub status: JobStatus,
    pub retry_count: u32,
    pub next_retry_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingJob {
    /// A job is due when it is pending and its retry time has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && self.next_retry_at <= now
    }
}

/// Fields for a job that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub url: String,
    pub next_retry_at: DateTime<Utc>,
    pub error_msg: Option<String>,
}

/// Partial update of a job. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub retry_count: Option<u32>,
    pub next_retry_at: Option<DateTime<Utc>>,
    /// `Some(None)` clears the stored error message
    pub error_msg: Option<Option<String>>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    pub fn with_next_retry_at(mut self, at: DateTime<Utc>) -> Self {
        self.next_retry_at = Some(at);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_msg = Some(Some(error.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error_msg = Some(None);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job(status: JobStatus, next_retry_at: DateTime<Utc>) -> ProcessingJob {
        let now = Utc::now();
        ProcessingJob {
            id: 1,
            url: "https://youtu.be/abc".into(),
            status,
            retry_count: 0,
            next_retry_at,
            error_msg: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_job_is_due() {
        let now = Utc::now();
        assert!(job(JobStatus::Pending, now).is_due(now));
        assert!(job(JobStatus::Pending, now - Duration::minutes(1)).is_due(now));
        assert!(!job(JobStatus::Pending, now + Duration::minutes(1)).is_due(now));
        assert!(!job(JobStatus::Processing, now - Duration::minutes(1)).is_due(now));
        assert!(!job(JobStatus::Failed, now - Duration::minutes(1)).is_due(now));
    }

    #[test]
    fn test_job_status_serialization() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!("completed".parse::<JobStatus>(), Ok(JobStatus::Completed));
        assert!("bogus".parse::<JobStatus>().is_err());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_job_update_builder() {
        let update = JobUpdate::status(JobStatus::Failed)
            .with_retry_count(6)
            .with_error("quota exceeded");
        assert_eq!(update.status, Some(JobStatus::Failed));
        assert_eq!(update.retry_count, Some(6));
        assert_eq!(update.error_msg, Some(Some("quota exceeded".to_string())));
        assert_eq!(update.next_retry_at, None);

        assert_eq!(JobUpdate::default().clear_error().error_msg, Some(None));
    }
}
