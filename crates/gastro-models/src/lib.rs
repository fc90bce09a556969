//! Shared data models for the Gastroteca backend.
//!
//! This crate provides Serde-serializable types for:
//! - Recipe aggregates and AI-produced recipe drafts
//! - Processing jobs and their status
//! - Platform resolution of social-media video URLs
//! - Search text normalization

pub mod job;
pub mod page;
pub mod platform;
pub mod recipe;
pub mod text;

// Re-export common types
pub use job::{JobId, JobStatus, JobUpdate, NewJob, ProcessingJob};
pub use page::{Page, RecipeFilter};
pub use platform::{resolve_platform, Platform, PlatformError, PlatformResult, VideoSource};
pub use recipe::{
    Ingredient, NewRecipe, Recipe, RecipeDraft, RecipeId, RecipeSummary, Step, Tag,
};
pub use text::normalize_search_text;
