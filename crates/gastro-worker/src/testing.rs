//! Fake collaborators for pipeline and worker tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use gastro_gemini::{ExtractError, ExtractResult, RecipeExtractor};
use gastro_media::{thumbnail_path_for, AcquiredVideo, MediaError, MediaResult, VideoAcquirer};
use gastro_models::{
    Ingredient, NewRecipe, Page, Recipe, RecipeDraft, RecipeFilter, RecipeId, RecipeSummary,
};
use gastro_store::{RecipeRepository, SqliteStore, StoreResult};

pub fn memory_store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

pub fn draft(title: &str) -> RecipeDraft {
    RecipeDraft {
        title: title.to_string(),
        description: "Receta casera".to_string(),
        cooking_time: "20 min".to_string(),
        ingredients: vec![Ingredient::new("patatas", "3")],
        steps: vec!["Pelar".to_string(), "Freír".to_string()],
        tags: vec!["cena".to_string()],
        video_file_id: "files/fake".to_string(),
    }
}

#[derive(Debug, Clone)]
pub enum AcquireBehavior {
    /// Write a video and a thumbnail at the destination
    Succeed,
    /// Fail like yt-dlp with the given stderr
    Fail(String),
}

pub struct FakeAcquirer {
    behavior: Mutex<AcquireBehavior>,
    calls: AtomicUsize,
    last_destination: Mutex<Option<PathBuf>>,
}

impl FakeAcquirer {
    pub fn new(behavior: AcquireBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
            last_destination: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_destination(&self) -> Option<PathBuf> {
        self.last_destination.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoAcquirer for FakeAcquirer {
    async fn acquire(&self, _url: &str, destination: &Path) -> MediaResult<AcquiredVideo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_destination.lock().unwrap() = Some(destination.to_path_buf());

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            AcquireBehavior::Succeed => {
                if let Some(parent) = destination.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(destination, b"video")?;
                let thumbnail_path = thumbnail_path_for(destination);
                std::fs::write(&thumbnail_path, b"thumb")?;
                Ok(AcquiredVideo {
                    video_path: destination.to_path_buf(),
                    thumbnail_path,
                })
            }
            AcquireBehavior::Fail(stderr) => Err(MediaError::DownloadFailed {
                message: "yt-dlp failed".to_string(),
                stderr: Some(stderr),
                exit_code: Some(1),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExtractBehavior {
    Recipe(RecipeDraft),
    NotARecipe,
    /// Fail with an API error carrying this HTTP status
    Status(u16),
    /// Fail with a non-HTTP error message
    Message(String),
}

pub struct FakeExtractor {
    behavior: Mutex<ExtractBehavior>,
    calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn new(behavior: ExtractBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_behavior(&self, behavior: ExtractBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }
}

#[async_trait]
impl RecipeExtractor for FakeExtractor {
    async fn analyze(&self, _video_path: &Path) -> ExtractResult<RecipeDraft> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            ExtractBehavior::Recipe(draft) => Ok(draft),
            ExtractBehavior::NotARecipe => Err(ExtractError::NotARecipe),
            ExtractBehavior::Status(status) => Err(ExtractError::from_http_status(
                status,
                "generateContent failed: RESOURCE_EXHAUSTED",
            )),
            ExtractBehavior::Message(message) => Err(ExtractError::invalid_response(message)),
        }
    }
}

/// Repository whose natural-key lookup always misses, reproducing the window
/// between the dedup check and the insert.
pub struct LookupMissRepository(pub SqliteStore);

#[async_trait]
impl RecipeRepository for LookupMissRepository {
    async fn find_by_natural_key(
        &self,
        _source: &str,
        _external_id: &str,
    ) -> StoreResult<Option<Recipe>> {
        Ok(None)
    }

    async fn create(&self, recipe: &NewRecipe) -> StoreResult<Recipe> {
        self.0.create(recipe).await
    }

    async fn get(&self, id: RecipeId) -> StoreResult<Option<Recipe>> {
        self.0.get(id).await
    }

    async fn delete(&self, id: RecipeId) -> StoreResult<Option<Recipe>> {
        self.0.delete(id).await
    }

    async fn list_page(
        &self,
        offset: u64,
        limit: u64,
        filter: &RecipeFilter,
    ) -> StoreResult<Page<RecipeSummary>> {
        self.0.list_page(offset, limit, filter).await
    }

    async fn update(&self, recipe: &Recipe) -> StoreResult<Recipe> {
        self.0.update(recipe).await
    }

    async fn reindex_search_text(&self) -> StoreResult<usize> {
        self.0.reindex_search_text().await
    }
}
