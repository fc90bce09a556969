//! Video processing handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gastro_models::JobId;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub url: String,
}

/// Body returned when the URL was deferred to the retry queue.
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub status: &'static str,
    pub job_id: JobId,
    pub message: String,
}

/// POST /api/process
///
/// Runs the full pipeline for `url` and returns the stored recipe. A rate
/// limit or quota failure schedules a retry job and answers 202.
pub async fn process_video(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> ApiResult<Response> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(ApiError::bad_request("url is required"));
    }

    match state.pipeline.process(url).await {
        Ok(recipe) => Ok(Json(recipe).into_response()),
        Err(e) if e.is_transient() => {
            warn!(url = %url, error = %e, "Transient failure, deferring to retry queue");
            let job = state.queue.enqueue(url, &e.to_string()).await?;
            info!(job_id = job.id, "Video queued for retry");

            let body = QueuedResponse {
                status: "queued",
                job_id: job.id,
                message: format!(
                    "The AI service is busy. The video will be processed automatically \
                     (next attempt at {}).",
                    job.next_retry_at.to_rfc3339()
                ),
            };
            Ok((StatusCode::ACCEPTED, Json(body)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
