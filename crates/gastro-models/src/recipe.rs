//! Recipe aggregate models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::VideoSource;
use crate::text::normalize_search_text;

/// Auto-assigned recipe identifier.
pub type RecipeId = i64;

/// A single ingredient line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub item: String,
    #[serde(default)]
    pub quantity: String,
}

impl Ingredient {
    pub fn new(item: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            quantity: quantity.into(),
        }
    }
}

/// A preparation step. Steps are ordered by their position in the recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub text: String,
}

/// A free-form tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// A persisted recipe with its owned ingredients, steps and tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    pub description: String,
    pub cooking_time: String,
    /// Web-servable path of the downloaded video (e.g. `videos/video_123.mp4`)
    pub local_video_path: String,
    /// Web-servable path of the thumbnail (e.g. `videos/video_123.jpg`)
    pub thumbnail_path: String,
    /// Reference to the file on the AI provider side, if any
    #[serde(default)]
    pub video_file_id: String,
    /// Source platform (`youtube`, `instagram`, `tiktok`)
    pub source: String,
    pub external_id: String,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    /// Normalized text used for search (`title + " " + description`).
    pub fn search_text(&self) -> String {
        search_text_for(&self.title, &self.description)
    }
}

/// Recipe list entry: the aggregate without ingredients and steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub title: String,
    pub description: String,
    pub cooking_time: String,
    pub local_video_path: String,
    pub thumbnail_path: String,
    pub source: String,
    pub external_id: String,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
}

impl From<Recipe> for RecipeSummary {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            description: recipe.description,
            cooking_time: recipe.cooking_time,
            local_video_path: recipe.local_video_path,
            thumbnail_path: recipe.thumbnail_path,
            source: recipe.source,
            external_id: recipe.external_id,
            tags: recipe.tags,
            created_at: recipe.created_at,
        }
    }
}

/// Recipe extracted by the AI model, before it is tied to a source video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    pub cooking_time: String,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    pub tags: Vec<String>,
    /// Remote file reference used during extraction
    #[serde(default)]
    pub video_file_id: String,
}

impl RecipeDraft {
    /// Attach the natural key and media paths, producing an insertable recipe.
    pub fn into_new_recipe(
        self,
        source: &VideoSource,
        local_video_path: impl Into<String>,
        thumbnail_path: impl Into<String>,
    ) -> NewRecipe {
        NewRecipe {
            title: self.title,
            description: self.description,
            cooking_time: self.cooking_time,
            local_video_path: local_video_path.into(),
            thumbnail_path: thumbnail_path.into(),
            video_file_id: self.video_file_id,
            source: source.platform.as_str().to_string(),
            external_id: source.external_id.clone(),
            ingredients: self.ingredients,
            steps: self.steps.into_iter().map(|text| Step { text }).collect(),
            tags: self.tags.into_iter().map(|name| Tag { name }).collect(),
        }
    }
}

/// A recipe that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub cooking_time: String,
    pub local_video_path: String,
    pub thumbnail_path: String,
    pub video_file_id: String,
    pub source: String,
    pub external_id: String,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    pub tags: Vec<Tag>,
}

impl NewRecipe {
    pub fn search_text(&self) -> String {
        search_text_for(&self.title, &self.description)
    }
}

fn search_text_for(title: &str, description: &str) -> String {
    normalize_search_text(&format!("{} {}", title, description))
}
