//! Job enqueue for URLs that hit a transient failure.

use std::sync::Arc;

use chrono::{Duration, Utc};
use gastro_models::{NewJob, ProcessingJob};
use gastro_store::{JobStore, StoreResult};
use tracing::info;

use crate::metrics::record_job_enqueued;

/// Front door of the retry queue.
#[derive(Clone)]
pub struct JobQueue {
    jobs: Arc<dyn JobStore>,
    backoff: Duration,
}

impl JobQueue {
    pub fn new(jobs: Arc<dyn JobStore>, backoff: Duration) -> Self {
        Self { jobs, backoff }
    }

    /// Schedule `url` for a retry after the backoff.
    ///
    /// An existing PENDING or PROCESSING job for the same URL is returned
    /// unchanged instead of creating a second one.
    pub async fn enqueue(&self, url: &str, reason: &str) -> StoreResult<ProcessingJob> {
        if let Some(existing) = self.jobs.find_active_by_url(url).await? {
            info!(
                job_id = existing.id,
                url = %url,
                "Job already queued for URL"
            );
            return Ok(existing);
        }

        let job = self
            .jobs
            .create(&NewJob {
                url: url.to_string(),
                next_retry_at: Utc::now() + self.backoff,
                error_msg: Some(reason.to_string()),
            })
            .await?;
        record_job_enqueued();
        Ok(job)
    }
}
