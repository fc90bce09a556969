//! Recipe pipeline and retry worker.
//!
//! This crate provides:
//! - The pipeline orchestrator (resolve, dedup, download, extract, persist)
//! - Failure classification shared by the API and the worker
//! - The job queue front door and the periodic retry worker
//! - Structured job logging and pipeline metrics

pub mod classify;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{classify_extract_error, classify_media_error, classify_message, FailureClass};
pub use config::WorkerConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::JobLogger;
pub use pipeline::{Pipeline, MEDIA_URL_PREFIX};
pub use queue::JobQueue;
pub use worker::{RetryWorker, TickReport};
