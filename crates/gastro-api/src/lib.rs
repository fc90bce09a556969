//! Axum HTTP API server.
//!
//! This crate provides:
//! - Video submission with synchronous processing and retry queueing
//! - Paginated, accent-insensitive recipe search
//! - Operator endpoints for processing jobs
//! - Static media serving and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
