//! SQLite persistence for the Gastroteca backend.
//!
//! This crate provides:
//! - The `RecipeRepository` and `JobStore` traits used by the pipeline and worker
//! - `SqliteStore`, a rusqlite implementation of both
//! - A versioned migration table
//!
//! The `(source, external_id)` pair is protected by a unique index; violations
//! surface as [`StoreError::Conflict`].

pub mod db;
pub mod error;
pub mod job_repo;
pub mod migrations;
pub mod recipe_repo;
pub mod store;

pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use job_repo::JobStore;
pub use recipe_repo::RecipeRepository;
pub use store::SqliteStore;
