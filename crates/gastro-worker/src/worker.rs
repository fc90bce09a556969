//! Retry worker.
//!
//! Periodically re-drives due jobs through the pipeline, one at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gastro_models::{JobStatus, JobUpdate, ProcessingJob};
use gastro_store::JobStore;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, Instrument};

use crate::config::WorkerConfig;
use crate::error::PipelineError;
use crate::logging::JobLogger;
use crate::metrics::{record_job_attempt, record_tick_skipped};
use crate::pipeline::Pipeline;

/// Counts of what happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub due: usize,
    pub completed: usize,
    pub rescheduled: usize,
    pub failed: usize,
    /// Jobs whose status could not be written
    pub store_errors: usize,
}

/// Periodic task that retries PENDING jobs whose retry time has passed.
pub struct RetryWorker {
    pipeline: Arc<Pipeline>,
    jobs: Arc<dyn JobStore>,
    config: WorkerConfig,
    tick_guard: Mutex<()>,
    shutdown: watch::Sender<bool>,
}

impl RetryWorker {
    pub fn new(pipeline: Arc<Pipeline>, jobs: Arc<dyn JobStore>, config: WorkerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            pipeline,
            jobs,
            config,
            tick_guard: Mutex::new(()),
            shutdown,
        }
    }

    /// Run until [`shutdown`](Self::shutdown) is called.
    ///
    /// The first tick fires immediately; missed ticks are skipped.
    pub async fn run(&self) {
        info!(
            poll_interval_secs = self.config.effective_poll_interval().as_secs(),
            max_retries = self.config.max_retries,
            "Starting retry worker"
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        if *shutdown_rx.borrow() {
            info!("Shutdown requested before start, retry worker not started");
            return;
        }

        let mut interval = tokio::time::interval(self.config.effective_poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping retry worker");
                        break;
                    }
                }
                _ = interval.tick() => {
                    if let Some(report) = self.tick(Utc::now()).await {
                        if report.due > 0 {
                            info!(
                                due = report.due,
                                completed = report.completed,
                                rescheduled = report.rescheduled,
                                failed = report.failed,
                                "Retry tick finished"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Signal shutdown. Also stops a `run` that has not started yet.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Process every job due at `now`.
    ///
    /// Returns `None` without doing anything when another tick is running.
    pub async fn tick(&self, now: DateTime<Utc>) -> Option<TickReport> {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            debug!("Previous retry tick still running, skipping");
            record_tick_skipped();
            return None;
        };

        let mut report = TickReport::default();
        let due = match self.jobs.find_due(now).await {
            Ok(due) => due,
            Err(e) => {
                error!("Failed to load due jobs: {}", e);
                report.store_errors += 1;
                return Some(report);
            }
        };
        report.due = due.len();

        for job in due {
            match self.retry_job(&job).await {
                Some(JobStatus::Completed) => report.completed += 1,
                Some(JobStatus::Pending) => report.rescheduled += 1,
                Some(JobStatus::Failed) => report.failed += 1,
                Some(JobStatus::Processing) | None => report.store_errors += 1,
            }
        }

        Some(report)
    }

    /// Returns the status written for the job, or `None` when a store write
    /// failed.
    async fn retry_job(&self, job: &ProcessingJob) -> Option<JobStatus> {
        let logger = JobLogger::new(job.id, "retry");
        logger.log_start(&format!("{} (attempt {})", job.url, job.retry_count + 1));

        if let Err(e) = self
            .jobs
            .update(job.id, &JobUpdate::status(JobStatus::Processing))
            .await
        {
            logger.log_error(&format!("Failed to mark job PROCESSING: {}", e));
            return None;
        }

        let result = self
            .pipeline
            .process(&job.url)
            .instrument(logger.create_span())
            .await;

        let update = match result {
            Ok(recipe) => {
                logger.log_completion(&format!("recipe {}", recipe.id));
                JobUpdate::status(JobStatus::Completed).clear_error()
            }
            Err(PipelineError::PersistConflict(_)) => {
                logger.log_completion("recipe was stored concurrently");
                JobUpdate::status(JobStatus::Completed).clear_error()
            }
            Err(e) => self.failure_update(job, &e, Utc::now(), &logger),
        };

        let status = update.status.unwrap_or(JobStatus::Failed);
        record_job_attempt(status.as_str());

        match self.jobs.update(job.id, &update).await {
            Ok(_) => Some(status),
            Err(e) => {
                logger.log_error(&format!("Failed to record job outcome: {}", e));
                None
            }
        }
    }

    fn failure_update(
        &self,
        job: &ProcessingJob,
        error: &PipelineError,
        failed_at: DateTime<Utc>,
        logger: &JobLogger,
    ) -> JobUpdate {
        let retry_count = job.retry_count + 1;
        let base = |status| {
            JobUpdate::status(status)
                .with_retry_count(retry_count)
                .with_error(error.to_string())
        };

        if !error.is_transient() {
            logger.log_error(&format!("terminal failure ({}): {}", error.kind(), error));
            return base(JobStatus::Failed);
        }

        if job.retry_count >= self.config.max_retries {
            logger.log_error(&format!(
                "giving up after {} retries: {}",
                retry_count, error
            ));
            return base(JobStatus::Failed);
        }

        let next_retry_at = failed_at + self.config.retry_backoff_chrono();
        logger.log_warning(&format!(
            "transient failure, retrying at {}: {}",
            next_retry_at, error
        ));
        base(JobStatus::Pending).with_next_retry_at(next_retry_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        draft, memory_store, AcquireBehavior, ExtractBehavior, FakeAcquirer, FakeExtractor,
    };
    use chrono::Duration;
    use gastro_models::{resolve_platform, NewJob};
    use gastro_store::{RecipeRepository, SqliteStore};

    struct Harness {
        store: SqliteStore,
        acquirer: Arc<FakeAcquirer>,
        extractor: Arc<FakeExtractor>,
        worker: Arc<RetryWorker>,
        _dir: tempfile::TempDir,
    }

    fn harness(extract: ExtractBehavior) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = memory_store();
        let acquirer = Arc::new(FakeAcquirer::new(AcquireBehavior::Succeed));
        let extractor = Arc::new(FakeExtractor::new(extract));
        let pipeline = Arc::new(Pipeline::new(
            Arc::new(store.clone()),
            acquirer.clone(),
            extractor.clone(),
            dir.path().join("videos"),
        ));
        let worker = Arc::new(RetryWorker::new(
            pipeline,
            Arc::new(store.clone()),
            WorkerConfig::default(),
        ));
        Harness {
            store,
            acquirer,
            extractor,
            worker,
            _dir: dir,
        }
    }

    async fn due_job(store: &SqliteStore, url: &str, retry_count: u32) -> ProcessingJob {
        let job = JobStore::create(
            store,
            &NewJob {
                url: url.to_string(),
                next_retry_at: Utc::now() - Duration::minutes(1),
                error_msg: Some("429".to_string()),
            },
        )
        .await
        .unwrap();
        if retry_count == 0 {
            return job;
        }
        JobStore::update(
            store,
            job.id,
            &JobUpdate::default().with_retry_count(retry_count),
        )
        .await
        .unwrap()
    }

    async fn reload(store: &SqliteStore, job: &ProcessingJob) -> ProcessingJob {
        JobStore::get(store, job.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_success_completes_job() {
        let h = harness(ExtractBehavior::Recipe(draft("Tortilla")));
        let job = due_job(&h.store, "https://youtu.be/abc123", 2).await;

        let report = h.worker.tick(Utc::now()).await.unwrap();

        assert_eq!(report.due, 1);
        assert_eq!(report.completed, 1);
        let job = reload(&h.store, &job).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.error_msg, None);
        assert_eq!(job.retry_count, 2);
    }

    #[tokio::test]
    async fn test_transient_failure_reschedules_with_backoff() {
        let h = harness(ExtractBehavior::Status(429));
        let job = due_job(&h.store, "https://youtu.be/abc123", 0).await;
        let now = Utc::now();

        let report = h.worker.tick(now).await.unwrap();
        let finished = Utc::now();

        assert_eq!(report.rescheduled, 1);
        let job = reload(&h.store, &job).await;
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 1);
        assert!(job.error_msg.as_deref().unwrap().contains("429"));
        assert!(job.next_retry_at >= now + Duration::minutes(15));
        assert!(job.next_retry_at <= finished + Duration::minutes(15));

        // Not due again until the backoff has passed
        assert_eq!(h.worker.tick(now).await.unwrap().due, 0);
    }

    #[tokio::test]
    async fn test_backoff_counts_from_failure_not_tick_start() {
        let h = harness(ExtractBehavior::Status(429));
        let first = due_job(&h.store, "https://youtu.be/first", 0).await;
        let second = due_job(&h.store, "https://youtu.be/second", 0).await;

        // A tick that started long before its jobs actually failed
        let tick_start = first.next_retry_at.max(second.next_retry_at);
        let before = Utc::now();
        h.worker.tick(tick_start).await.unwrap();

        for job in [&first, &second] {
            let job = reload(&h.store, job).await;
            assert_eq!(job.status, JobStatus::Pending);
            assert!(job.next_retry_at >= before + Duration::minutes(15));
        }
    }

    #[tokio::test]
    async fn test_ceiling_reached_marks_failed() {
        let h = harness(ExtractBehavior::Status(429));
        let below = due_job(&h.store, "https://youtu.be/below", 4).await;
        let at = due_job(&h.store, "https://youtu.be/atceiling", 5).await;

        h.worker.tick(Utc::now()).await.unwrap();

        let below = reload(&h.store, &below).await;
        assert_eq!(below.status, JobStatus::Pending);
        assert_eq!(below.retry_count, 5);

        let at = reload(&h.store, &at).await;
        assert_eq!(at.status, JobStatus::Failed);
        assert_eq!(at.retry_count, 6);
        assert!(at.error_msg.as_deref().unwrap().contains("RESOURCE_EXHAUSTED"));

        // FAILED jobs are never picked up again
        let later = Utc::now() + Duration::hours(1);
        h.worker.tick(later).await.unwrap();
        assert_eq!(reload(&h.store, &at).await.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_terminal_failure_fails_immediately() {
        let h = harness(ExtractBehavior::NotARecipe);
        let job = due_job(&h.store, "https://youtu.be/abc123", 0).await;

        let report = h.worker.tick(Utc::now()).await.unwrap();

        assert_eq!(report.failed, 1);
        let job = reload(&h.store, &job).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.retry_count, 1);
        assert!(job.error_msg.is_some());
    }

    #[tokio::test]
    async fn test_existing_recipe_completes_without_download() {
        let h = harness(ExtractBehavior::Status(429));
        let source = resolve_platform("https://youtu.be/abc123").unwrap();
        RecipeRepository::create(
            &h.store,
            &draft("Tortilla").into_new_recipe(&source, "videos/a.mp4", "videos/a.jpg"),
        )
        .await
        .unwrap();
        let job = due_job(&h.store, "https://www.youtube.com/shorts/abc123", 3).await;

        h.worker.tick(Utc::now()).await.unwrap();

        assert_eq!(h.acquirer.calls(), 0);
        assert_eq!(h.extractor.calls(), 0);
        assert_eq!(reload(&h.store, &job).await.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_failing_job_does_not_stop_tick() {
        let h = harness(ExtractBehavior::Recipe(draft("Tortilla")));
        let bad = due_job(&h.store, "https://vimeo.com/12345", 0).await;
        let good = due_job(&h.store, "https://youtu.be/abc123", 0).await;

        let report = h.worker.tick(Utc::now()).await.unwrap();

        assert_eq!(report.due, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.completed, 1);
        assert_eq!(reload(&h.store, &bad).await.status, JobStatus::Failed);
        assert_eq!(reload(&h.store, &good).await.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_recovery_after_rate_limit() {
        let h = harness(ExtractBehavior::Status(429));
        let job = due_job(&h.store, "https://youtu.be/abc123", 0).await;

        h.worker.tick(Utc::now()).await.unwrap();
        h.extractor
            .set_behavior(ExtractBehavior::Recipe(draft("Tortilla")));
        h.worker
            .tick(Utc::now() + Duration::minutes(16))
            .await
            .unwrap();

        let job = reload(&h.store, &job).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.retry_count, 1);
        assert_eq!(h.extractor.calls(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let h = harness(ExtractBehavior::Recipe(draft("Tortilla")));

        let _held = h.worker.tick_guard.lock().await;
        assert_eq!(h.worker.tick(Utc::now()).await, None);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let h = harness(ExtractBehavior::Recipe(draft("Tortilla")));
        let job = due_job(&h.store, "https://youtu.be/abc123", 0).await;

        let worker = h.worker.clone();
        let handle = tokio::spawn(async move { worker.run().await });

        // The first tick fires immediately
        for _ in 0..50 {
            if reload(&h.store, &job).await.status == JobStatus::Completed {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(reload(&h.store, &job).await.status, JobStatus::Completed);

        h.worker.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_before_run_is_honored() {
        let h = harness(ExtractBehavior::Recipe(draft("Tortilla")));
        let job = due_job(&h.store, "https://youtu.be/abc123", 0).await;

        h.worker.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), h.worker.run())
            .await
            .unwrap();

        assert_eq!(reload(&h.store, &job).await.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_zero_poll_interval_does_not_panic() {
        let h = harness(ExtractBehavior::Recipe(draft("Tortilla")));
        let pipeline = h.worker.pipeline.clone();
        let worker = Arc::new(RetryWorker::new(
            pipeline,
            Arc::new(h.store.clone()),
            WorkerConfig {
                poll_interval: std::time::Duration::ZERO,
                ..WorkerConfig::default()
            },
        ));

        let running = worker.clone();
        let handle = tokio::spawn(async move { running.run().await });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        worker.shutdown();

        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
