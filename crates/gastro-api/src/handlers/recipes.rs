//! Recipe catalog handlers.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use gastro_media::remove_if_exists;
use gastro_models::{Recipe, RecipeFilter, RecipeId, RecipeSummary};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;

/// Query parameters for the recipe list. Unparseable numbers fall back to
/// their defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListRecipesQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

impl ListRecipesQuery {
    fn page(&self) -> u64 {
        self.page
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&p| p >= 1)
            .unwrap_or(1)
    }

    fn limit(&self) -> u64 {
        self.limit
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&l| l >= 1)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }

    fn filter(&self) -> RecipeFilter {
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => RecipeFilter::search(term),
            _ => RecipeFilter::default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub current_page: u64,
    pub limit: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct RecipeListResponse {
    pub data: Vec<RecipeSummary>,
    pub meta: PageMeta,
}

/// GET /api/recipes?page=&limit=&search=
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<ListRecipesQuery>,
) -> ApiResult<Json<RecipeListResponse>> {
    let page = query.page();
    let limit = query.limit();
    let offset = (page - 1).saturating_mul(limit);

    let result = state
        .recipes
        .list_page(offset, limit, &query.filter())
        .await?;
    let total_pages = result.total_pages(limit);

    Ok(Json(RecipeListResponse {
        meta: PageMeta {
            current_page: page,
            limit,
            total_items: result.total,
            total_pages,
        },
        data: result.items,
    }))
}

/// GET /api/recipes/:id
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
) -> ApiResult<Json<Recipe>> {
    state
        .recipes
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Recipe not found"))
}

/// DELETE /api/recipes/:id
///
/// Removes the recipe with its ingredients, steps and tags, then its video
/// and thumbnail files.
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
) -> ApiResult<StatusCode> {
    let recipe = state
        .recipes
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

    let videos_dir = state.config.videos_dir();
    for stored in [&recipe.local_video_path, &recipe.thumbnail_path] {
        let Some(path) = media_file_path(&videos_dir, stored) else {
            continue;
        };
        if let Err(e) = remove_if_exists(&path).await {
            warn!(recipe_id = id, path = %path.display(), error = %e, "Failed to remove media file");
        }
    }

    info!(recipe_id = id, title = %recipe.title, "Recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Resolve a stored `videos/<file>` path inside the media directory. Only the
/// file name is used so a stored path can never point outside it.
fn media_file_path(videos_dir: &FsPath, stored: &str) -> Option<PathBuf> {
    FsPath::new(stored)
        .file_name()
        .map(|name| videos_dir.join(name))
}
