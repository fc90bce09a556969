//! Job repository: CRUD operations for the `processing_jobs` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gastro_models::{JobId, JobStatus, JobUpdate, NewJob, ProcessingJob};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::db::{from_db_time, to_db_time};
use crate::error::{StoreError, StoreResult};
use crate::store::SqliteStore;

/// Persistence for deferred processing jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: &NewJob) -> StoreResult<ProcessingJob>;

    /// PENDING jobs whose next retry is at or before `now`, oldest first.
    async fn find_due(&self, now: DateTime<Utc>) -> StoreResult<Vec<ProcessingJob>>;

    /// Apply a partial update and return the updated job.
    async fn update(&self, id: JobId, update: &JobUpdate) -> StoreResult<ProcessingJob>;

    async fn delete(&self, id: JobId) -> StoreResult<bool>;

    async fn get(&self, id: JobId) -> StoreResult<Option<ProcessingJob>>;

    /// All jobs, optionally filtered by status, newest first.
    async fn list(&self, status: Option<JobStatus>) -> StoreResult<Vec<ProcessingJob>>;

    /// A PENDING or PROCESSING job for `url`, if any.
    async fn find_active_by_url(&self, url: &str) -> StoreResult<Option<ProcessingJob>>;

    /// Move every PROCESSING job back to PENDING. Returns the number of jobs.
    async fn reset_processing(&self) -> StoreResult<usize>;
}

/// A raw job row from the database.
#[derive(Debug, Clone)]
struct JobRow {
    id: JobId,
    url: String,
    status: String,
    retry_count: i64,
    next_retry_at: String,
    error_msg: Option<String>,
    created_at: String,
    updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            url: row.get("url")?,
            status: row.get("status")?,
            retry_count: row.get("retry_count")?,
            next_retry_at: row.get("next_retry_at")?,
            error_msg: row.get("error_msg")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_job(self) -> StoreResult<ProcessingJob> {
        Ok(ProcessingJob {
            id: self.id,
            url: self.url,
            status: self.status.parse().map_err(StoreError::InvalidData)?,
            retry_count: u32::try_from(self.retry_count).map_err(|_| {
                StoreError::InvalidData(format!("negative retry_count {}", self.retry_count))
            })?,
            next_retry_at: from_db_time(&self.next_retry_at)?,
            error_msg: self.error_msg,
            created_at: from_db_time(&self.created_at)?,
            updated_at: from_db_time(&self.updated_at)?,
        })
    }
}

const JOB_COLUMNS: &str =
    "id, url, status, retry_count, next_retry_at, error_msg, created_at, updated_at";

// =============================================================================
// Synchronous queries
// =============================================================================

fn collect_jobs(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> StoreResult<Vec<ProcessingJob>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, JobRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(JobRow::into_job).collect()
}

fn find_by_id(conn: &Connection, id: JobId) -> StoreResult<Option<ProcessingJob>> {
    conn.query_row(
        &format!("SELECT {} FROM processing_jobs WHERE id = ?1", JOB_COLUMNS),
        params![id],
        JobRow::from_row,
    )
    .optional()?
    .map(JobRow::into_job)
    .transpose()
}

fn insert(conn: &Connection, job: &NewJob) -> StoreResult<ProcessingJob> {
    let now = to_db_time(Utc::now());
    conn.execute(
        "INSERT INTO processing_jobs (url, status, retry_count, next_retry_at, error_msg,
         created_at, updated_at)
         VALUES (?1, ?2, 0, ?3, ?4, ?5, ?5)",
        params![
            job.url,
            JobStatus::Pending.as_str(),
            to_db_time(job.next_retry_at),
            job.error_msg,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    find_by_id(conn, id)?.ok_or_else(|| StoreError::not_found(format!("job {}", id)))
}

fn apply_update(conn: &Connection, id: JobId, update: &JobUpdate) -> StoreResult<ProcessingJob> {
    let mut assignments = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(id)];

    if let Some(status) = update.status {
        param_values.push(Box::new(status.as_str()));
        assignments.push(format!("status = ?{}", param_values.len()));
    }
    if let Some(retry_count) = update.retry_count {
        param_values.push(Box::new(retry_count as i64));
        assignments.push(format!("retry_count = ?{}", param_values.len()));
    }
    if let Some(next_retry_at) = update.next_retry_at {
        param_values.push(Box::new(to_db_time(next_retry_at)));
        assignments.push(format!("next_retry_at = ?{}", param_values.len()));
    }
    if let Some(error_msg) = &update.error_msg {
        param_values.push(Box::new(error_msg.clone()));
        assignments.push(format!("error_msg = ?{}", param_values.len()));
    }
    param_values.push(Box::new(to_db_time(Utc::now())));
    assignments.push(format!("updated_at = ?{}", param_values.len()));

    let sql = format!(
        "UPDATE processing_jobs SET {} WHERE id = ?1",
        assignments.join(", ")
    );
    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();

    let changed = conn.execute(&sql, params_ref.as_slice())?;
    if changed == 0 {
        return Err(StoreError::not_found(format!("job {}", id)));
    }

    find_by_id(conn, id)?.ok_or_else(|| StoreError::not_found(format!("job {}", id)))
}

// =============================================================================
// Async repository
// =============================================================================

#[async_trait]
impl JobStore for SqliteStore {
    async fn create(&self, job: &NewJob) -> StoreResult<ProcessingJob> {
        let job = job.clone();
        let created = self.db.run(move |conn| insert(conn, &job)).await?;
        info!(
            job_id = created.id,
            url = %created.url,
            next_retry_at = %created.next_retry_at,
            "Processing job created"
        );
        Ok(created)
    }

    async fn find_due(&self, now: DateTime<Utc>) -> StoreResult<Vec<ProcessingJob>> {
        let now = to_db_time(now);
        self.db
            .run(move |conn| {
                collect_jobs(
                    conn,
                    &format!(
                        "SELECT {} FROM processing_jobs
                         WHERE status = ?1 AND next_retry_at <= ?2
                         ORDER BY next_retry_at, id",
                        JOB_COLUMNS
                    ),
                    &[&JobStatus::Pending.as_str(), &now],
                )
            })
            .await
    }

    async fn update(&self, id: JobId, update: &JobUpdate) -> StoreResult<ProcessingJob> {
        let update = update.clone();
        let updated = self
            .db
            .run(move |conn| apply_update(conn, id, &update))
            .await?;
        debug!(
            job_id = id,
            status = %updated.status,
            retry_count = updated.retry_count,
            "Processing job updated"
        );
        Ok(updated)
    }

    async fn delete(&self, id: JobId) -> StoreResult<bool> {
        self.db
            .run(move |conn| {
                let deleted = conn.execute("DELETE FROM processing_jobs WHERE id = ?1", params![id])?;
                Ok(deleted > 0)
            })
            .await
    }

    async fn get(&self, id: JobId) -> StoreResult<Option<ProcessingJob>> {
        self.db.run(move |conn| find_by_id(conn, id)).await
    }

    async fn list(&self, status: Option<JobStatus>) -> StoreResult<Vec<ProcessingJob>> {
        self.db
            .run(move |conn| match status {
                Some(status) => collect_jobs(
                    conn,
                    &format!(
                        "SELECT {} FROM processing_jobs WHERE status = ?1
                         ORDER BY created_at DESC, id DESC",
                        JOB_COLUMNS
                    ),
                    &[&status.as_str()],
                ),
                None => collect_jobs(
                    conn,
                    &format!(
                        "SELECT {} FROM processing_jobs ORDER BY created_at DESC, id DESC",
                        JOB_COLUMNS
                    ),
                    &[],
                ),
            })
            .await
    }

    async fn find_active_by_url(&self, url: &str) -> StoreResult<Option<ProcessingJob>> {
        let url = url.to_string();
        self.db
            .run(move |conn| {
                let jobs = collect_jobs(
                    conn,
                    &format!(
                        "SELECT {} FROM processing_jobs
                         WHERE url = ?1 AND status IN (?2, ?3)
                         ORDER BY id LIMIT 1",
                        JOB_COLUMNS
                    ),
                    &[
                        &url,
                        &JobStatus::Pending.as_str(),
                        &JobStatus::Processing.as_str(),
                    ],
                )?;
                Ok(jobs.into_iter().next())
            })
            .await
    }

    async fn reset_processing(&self) -> StoreResult<usize> {
        let count = self
            .db
            .run(|conn| {
                Ok(conn.execute(
                    "UPDATE processing_jobs SET status = ?1, updated_at = ?2 WHERE status = ?3",
                    params![
                        JobStatus::Pending.as_str(),
                        to_db_time(Utc::now()),
                        JobStatus::Processing.as_str()
                    ],
                )?)
            })
            .await?;
        if count > 0 {
            info!(count, "Reset interrupted jobs to PENDING");
        }
        Ok(count)
    }
}
