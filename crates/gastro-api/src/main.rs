//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gastro_api::{create_router, metrics, ApiConfig, AppState};
use gastro_gemini::{GeminiClient, GeminiConfig};
use gastro_media::YtDlpAcquirer;
use gastro_store::{JobStore, RecipeRepository, SqliteStore};
use gastro_worker::{Pipeline, RetryWorker, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting gastro-api");

    let config = ApiConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);

    let videos_dir = config.videos_dir();
    tokio::fs::create_dir_all(&videos_dir)
        .await
        .with_context(|| format!("Failed to create media directory {}", videos_dir.display()))?;

    let store = SqliteStore::open(&config.database_path).with_context(|| {
        format!("Failed to open database {}", config.database_path.display())
    })?;

    let gemini_config = GeminiConfig::from_env();
    if !gemini_config.has_api_key() {
        warn!("GEMINI_API_KEY is not set. AI processing will fail.");
    }
    let extractor = GeminiClient::new(gemini_config).context("Failed to create Gemini client")?;

    let acquirer = YtDlpAcquirer::from_env();
    if !acquirer.is_available() {
        warn!("yt-dlp not found on PATH. Video downloads will fail.");
    }

    // Backfill search text for recipes stored before normalization changes
    let reindexed = RecipeRepository::reindex_search_text(&store)
        .await
        .context("Failed to recompute search text")?;
    info!(count = reindexed, "Search text up to date");

    JobStore::reset_processing(&store)
        .await
        .context("Failed to reset interrupted jobs")?;

    let worker_config = WorkerConfig::from_env();

    let pipeline = Arc::new(Pipeline::new(
        Arc::new(store.clone()),
        Arc::new(acquirer),
        Arc::new(extractor),
        videos_dir,
    ));

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("Failed to install Prometheus recorder")?)
    } else {
        None
    };

    let worker = Arc::new(RetryWorker::new(
        Arc::clone(&pipeline),
        Arc::new(store.clone()),
        worker_config.clone(),
    ));
    let worker_task = if worker_config.enabled {
        let worker = Arc::clone(&worker);
        Some(tokio::spawn(async move { worker.run().await }))
    } else {
        info!("Retry worker disabled");
        None
    };

    let state = AppState::new(
        config.clone(),
        store,
        pipeline,
        worker_config.retry_backoff_chrono(),
    );
    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    worker.shutdown();
    if let Some(task) = worker_task {
        if let Err(e) = task.await {
            warn!("Retry worker task ended abnormally: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Colored output for development, JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gastro=info,tower_http=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
