//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Install the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "gastro_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "gastro_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "gastro_http_requests_in_flight";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Collapse IDs and media file names so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    static NUMERIC_ID: OnceLock<Regex> = OnceLock::new();
    static MEDIA_FILE: OnceLock<Regex> = OnceLock::new();

    let numeric = NUMERIC_ID.get_or_init(|| Regex::new(r"/[0-9]+(/|$)").expect("valid id regex"));
    let media =
        MEDIA_FILE.get_or_init(|| Regex::new(r"^/videos/.+$").expect("valid media regex"));

    let path = numeric.replace_all(path, "/:id$1");
    media.replace_all(&path, "/videos/:file").to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/api/recipes/42"), "/api/recipes/:id");
        assert_eq!(sanitize_path("/api/jobs/7/"), "/api/jobs/:id/");
        assert_eq!(sanitize_path("/videos/video_123_ab.mp4"), "/videos/:file");
        assert_eq!(sanitize_path("/api/recipes"), "/api/recipes");
    }
}
