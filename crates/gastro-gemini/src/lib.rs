//! Recipe extraction through the Gemini API.
//!
//! This crate provides:
//! - The `RecipeExtractor` trait consumed by the pipeline
//! - A Gemini File API client (upload, poll, generate, delete)
//! - The extraction prompt and JSON response schema

pub mod client;
pub mod config;
pub mod error;
pub mod prompt;
pub mod types;

#[cfg(test)]
mod client_tests;

pub use client::{GeminiClient, RecipeExtractor};
pub use config::GeminiConfig;
pub use error::{ExtractError, ExtractResult};
pub use types::{ExtractedRecipe, FileState, RemoteFile, NOT_A_RECIPE_SENTINEL};
