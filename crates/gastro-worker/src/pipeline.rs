//! Recipe pipeline orchestrator.
//!
//! `process(url)` runs resolve → dedup lookup → download → extract → persist.
//! It never retries internally; transient failures are returned to the caller,
//! which decides whether to enqueue a job.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use gastro_gemini::RecipeExtractor;
use gastro_media::{remove_video_files, VideoAcquirer};
use gastro_models::{resolve_platform, Recipe};
use gastro_store::RecipeRepository;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::classify::{classify_extract_error, classify_media_error};
use crate::error::{PipelineError, PipelineResult};
use crate::metrics::record_pipeline_run;

/// Prefix under which the media directory is served over HTTP.
pub const MEDIA_URL_PREFIX: &str = "videos";

/// End-to-end processing of a video URL into a stored recipe.
pub struct Pipeline {
    recipes: Arc<dyn RecipeRepository>,
    acquirer: Arc<dyn VideoAcquirer>,
    extractor: Arc<dyn RecipeExtractor>,
    data_dir: PathBuf,
}

impl Pipeline {
    pub fn new(
        recipes: Arc<dyn RecipeRepository>,
        acquirer: Arc<dyn VideoAcquirer>,
        extractor: Arc<dyn RecipeExtractor>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            recipes,
            acquirer,
            extractor,
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Process a URL, returning the stored (or already existing) recipe.
    pub async fn process(&self, url: &str) -> PipelineResult<Recipe> {
        let span = info_span!("pipeline", url = %url);
        let result = self.run(url).instrument(span).await;

        if let Err(e) = &result {
            record_pipeline_run(e.kind());
        }
        result
    }

    async fn run(&self, url: &str) -> PipelineResult<Recipe> {
        let source = resolve_platform(url)?;
        info!(source = %source, "Resolved video source");

        if let Some(existing) = self
            .recipes
            .find_by_natural_key(source.platform.as_str(), &source.external_id)
            .await?
        {
            info!(recipe_id = existing.id, "Recipe already stored, skipping download");
            record_pipeline_run("dedup");
            return Ok(existing);
        }

        let destination = self.data_dir.join(unique_video_filename());
        let acquired = self
            .acquirer
            .acquire(url, &destination)
            .await
            .map_err(classify_media_error)?;

        info!(
            video = %acquired.video_path.display(),
            "Video downloaded, starting extraction"
        );

        let draft = match self.extractor.analyze(&acquired.video_path).await {
            Ok(draft) => draft,
            Err(e) => {
                let error = classify_extract_error(e);
                if matches!(error, PipelineError::NotARecipe) {
                    info!("Video is not a recipe, removing downloaded media");
                    if let Err(cleanup) = remove_video_files(&acquired.video_path).await {
                        warn!(
                            video = %acquired.video_path.display(),
                            error = %cleanup,
                            "Failed to remove downloaded media"
                        );
                    }
                }
                return Err(error);
            }
        };

        let recipe = draft.into_new_recipe(
            &source,
            media_url_path(&acquired.video_path),
            media_url_path(&acquired.thumbnail_path),
        );

        let stored = self.recipes.create(&recipe).await?;
        info!(recipe_id = stored.id, title = %stored.title, "Recipe created");
        record_pipeline_run("created");
        Ok(stored)
    }
}

/// `video_<unix-nanos>_<random>.mp4`
fn unique_video_filename() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let random = Uuid::new_v4().simple().to_string();
    format!("video_{}_{}.mp4", nanos, &random[..8])
}

/// Web-servable relative path for a file in the media directory.
fn media_url_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{}/{}", MEDIA_URL_PREFIX, file_name)
}
