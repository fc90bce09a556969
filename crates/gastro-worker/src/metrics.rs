//! Pipeline and worker metrics.

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Pipeline runs by outcome (`created`, `dedup`, or an error kind).
    pub const PIPELINE_RUNS_TOTAL: &str = "gastro_pipeline_runs_total";

    /// Jobs created for later retry.
    pub const JOBS_ENQUEUED_TOTAL: &str = "gastro_jobs_enqueued_total";

    /// Job attempts by resulting status.
    pub const JOB_ATTEMPTS_TOTAL: &str = "gastro_job_attempts_total";

    /// Worker ticks skipped because another tick was running.
    pub const TICKS_SKIPPED_TOTAL: &str = "gastro_worker_ticks_skipped_total";
}

pub fn record_pipeline_run(outcome: &str) {
    counter!(names::PIPELINE_RUNS_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

pub fn record_job_enqueued() {
    counter!(names::JOBS_ENQUEUED_TOTAL).increment(1);
}

pub fn record_job_attempt(status: &str) {
    counter!(names::JOB_ATTEMPTS_TOTAL, "status" => status.to_string()).increment(1);
}

pub fn record_tick_skipped() {
    counter!(names::TICKS_SKIPPED_TOTAL).increment(1);
}
