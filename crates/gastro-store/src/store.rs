//! SQLite-backed store implementing both repositories.

use std::path::Path;

use crate::db::Database;
use crate::error::StoreResult;

/// SQLite-backed store for recipes and processing jobs.
///
/// Implements [`RecipeRepository`](crate::RecipeRepository) and
/// [`JobStore`](crate::JobStore) over one shared connection.
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open (and migrate) the database file at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
