//! Processing job handlers for operators.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use gastro_models::{JobId, JobStatus, ProcessingJob};
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    /// PENDING, PROCESSING, COMPLETED or FAILED (case-insensitive)
    pub status: Option<String>,
}

/// GET /api/jobs?status=
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<ProcessingJob>>> {
    let status = match query.status.as_deref() {
        Some(raw) if !raw.is_empty() => {
            Some(raw.parse::<JobStatus>().map_err(ApiError::BadRequest)?)
        }
        _ => None,
    };

    Ok(Json(state.jobs.list(status).await?))
}

/// GET /api/jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> ApiResult<Json<ProcessingJob>> {
    state
        .jobs
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}

/// DELETE /api/jobs/:id
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> ApiResult<StatusCode> {
    if !state.jobs.delete(id).await? {
        return Err(ApiError::not_found("Job not found"));
    }
    info!(job_id = id, "Job deleted by operator");
    Ok(StatusCode::NO_CONTENT)
}
