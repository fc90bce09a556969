//! Application state.

use std::sync::Arc;

use gastro_store::{JobStore, RecipeRepository, SqliteStore};
use gastro_worker::{JobQueue, Pipeline};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub recipes: Arc<dyn RecipeRepository>,
    pub jobs: Arc<dyn JobStore>,
    pub pipeline: Arc<Pipeline>,
    pub queue: JobQueue,
}

impl AppState {
    /// Create new application state over a single store.
    pub fn new(
        config: ApiConfig,
        store: SqliteStore,
        pipeline: Arc<Pipeline>,
        retry_backoff: chrono::Duration,
    ) -> Self {
        let jobs: Arc<dyn JobStore> = Arc::new(store.clone());
        Self {
            config,
            recipes: Arc::new(store),
            queue: JobQueue::new(Arc::clone(&jobs), retry_backoff),
            jobs,
            pipeline,
        }
    }
}
