//! Recipe repository: the `recipes` table and its child tables.

use async_trait::async_trait;
use chrono::Utc;
use gastro_models::{
    normalize_search_text, Ingredient, NewRecipe, Page, Recipe, RecipeFilter, RecipeId,
    RecipeSummary, Step, Tag,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::db::{from_db_time, to_db_time};
use crate::error::{StoreError, StoreResult};
use crate::store::SqliteStore;

/// Persistence for recipe aggregates.
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Find a recipe by its `(source, external_id)` natural key.
    async fn find_by_natural_key(
        &self,
        source: &str,
        external_id: &str,
    ) -> StoreResult<Option<Recipe>>;

    /// Insert a recipe with its children.
    ///
    /// Fails with [`StoreError::Conflict`] when the natural key already exists.
    async fn create(&self, recipe: &NewRecipe) -> StoreResult<Recipe>;

    async fn get(&self, id: RecipeId) -> StoreResult<Option<Recipe>>;

    /// Delete a recipe and its children, returning the deleted aggregate.
    async fn delete(&self, id: RecipeId) -> StoreResult<Option<Recipe>>;

    /// One page of summaries, newest first.
    async fn list_page(
        &self,
        offset: u64,
        limit: u64,
        filter: &RecipeFilter,
    ) -> StoreResult<Page<RecipeSummary>>;

    /// Overwrite a recipe and its children; search text is recomputed.
    async fn update(&self, recipe: &Recipe) -> StoreResult<Recipe>;

    /// Recompute the search text of every recipe. Returns the number of rows.
    async fn reindex_search_text(&self) -> StoreResult<usize>;
}

/// A raw recipe row, without children.
struct RecipeRow {
    id: RecipeId,
    title: String,
    description: String,
    cooking_time: String,
    local_video_path: String,
    thumbnail_path: String,
    video_file_id: String,
    source: String,
    external_id: String,
    created_at: String,
    updated_at: String,
}

impl RecipeRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            cooking_time: row.get("cooking_time")?,
            local_video_path: row.get("local_video_path")?,
            thumbnail_path: row.get("thumbnail_path")?,
            video_file_id: row.get("video_file_id")?,
            source: row.get("source")?,
            external_id: row.get("external_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_recipe(
        self,
        ingredients: Vec<Ingredient>,
        steps: Vec<Step>,
        tags: Vec<Tag>,
    ) -> StoreResult<Recipe> {
        Ok(Recipe {
            id: self.id,
            title: self.title,
            description: self.description,
            cooking_time: self.cooking_time,
            local_video_path: self.local_video_path,
            thumbnail_path: self.thumbnail_path,
            video_file_id: self.video_file_id,
            source: self.source,
            external_id: self.external_id,
            ingredients,
            steps,
            tags,
            created_at: from_db_time(&self.created_at)?,
            updated_at: from_db_time(&self.updated_at)?,
        })
    }
}

const RECIPE_COLUMNS: &str = "id, title, description, cooking_time, local_video_path, \
     thumbnail_path, video_file_id, source, external_id, created_at, updated_at";

// =============================================================================
// Synchronous queries
// =============================================================================

fn load_tags(conn: &Connection, recipe_id: RecipeId) -> StoreResult<Vec<Tag>> {
    let mut stmt =
        conn.prepare("SELECT name FROM tags WHERE recipe_id = ?1 ORDER BY position, id")?;
    let tags = stmt
        .query_map(params![recipe_id], |r| Ok(Tag { name: r.get(0)? }))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

fn load_recipe_row(conn: &Connection, row: RecipeRow) -> StoreResult<Recipe> {
    let id = row.id;

    let mut stmt = conn.prepare(
        "SELECT item, quantity FROM ingredients WHERE recipe_id = ?1 ORDER BY position, id",
    )?;
    let ingredients = stmt
        .query_map(params![id], |r| {
            Ok(Ingredient {
                item: r.get(0)?,
                quantity: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt =
        conn.prepare("SELECT text FROM steps WHERE recipe_id = ?1 ORDER BY position, id")?;
    let steps = stmt
        .query_map(params![id], |r| Ok(Step { text: r.get(0)? }))?
        .collect::<Result<Vec<_>, _>>()?;

    let tags = load_tags(conn, id)?;
    row.into_recipe(ingredients, steps, tags)
}

pub(crate) fn find_by_id(conn: &Connection, id: RecipeId) -> StoreResult<Option<Recipe>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM recipes WHERE id = ?1", RECIPE_COLUMNS),
            params![id],
            RecipeRow::from_row,
        )
        .optional()?;
    row.map(|r| load_recipe_row(conn, r)).transpose()
}

fn find_by_key(conn: &Connection, source: &str, external_id: &str) -> StoreResult<Option<Recipe>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {} FROM recipes WHERE source = ?1 AND external_id = ?2",
                RECIPE_COLUMNS
            ),
            params![source, external_id],
            RecipeRow::from_row,
        )
        .optional()?;
    row.map(|r| load_recipe_row(conn, r)).transpose()
}

fn insert_children(
    conn: &Connection,
    recipe_id: RecipeId,
    ingredients: &[Ingredient],
    steps: &[Step],
    tags: &[Tag],
) -> StoreResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO ingredients (recipe_id, position, item, quantity) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, ingredient) in ingredients.iter().enumerate() {
        stmt.execute(params![
            recipe_id,
            position as i64,
            ingredient.item,
            ingredient.quantity
        ])?;
    }

    let mut stmt =
        conn.prepare("INSERT INTO steps (recipe_id, position, text) VALUES (?1, ?2, ?3)")?;
    for (position, step) in steps.iter().enumerate() {
        stmt.execute(params![recipe_id, position as i64, step.text])?;
    }

    let mut stmt =
        conn.prepare("INSERT INTO tags (recipe_id, position, name) VALUES (?1, ?2, ?3)")?;
    for (position, tag) in tags.iter().enumerate() {
        stmt.execute(params![recipe_id, position as i64, tag.name])?;
    }

    Ok(())
}

fn delete_children(conn: &Connection, recipe_id: RecipeId) -> StoreResult<()> {
    conn.execute("DELETE FROM ingredients WHERE recipe_id = ?1", params![recipe_id])?;
    conn.execute("DELETE FROM steps WHERE recipe_id = ?1", params![recipe_id])?;
    conn.execute("DELETE FROM tags WHERE recipe_id = ?1", params![recipe_id])?;
    Ok(())
}

pub(crate) fn insert(conn: &Connection, recipe: &NewRecipe) -> StoreResult<Recipe> {
    let now = to_db_time(Utc::now());
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO recipes (title, description, cooking_time, local_video_path,
         thumbnail_path, video_file_id, source, external_id, search_text, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            recipe.title,
            recipe.description,
            recipe.cooking_time,
            recipe.local_video_path,
            recipe.thumbnail_path,
            recipe.video_file_id,
            recipe.source,
            recipe.external_id,
            recipe.search_text(),
            now,
        ],
    )?;
    let id = tx.last_insert_rowid();
    insert_children(&tx, id, &recipe.ingredients, &recipe.steps, &recipe.tags)?;
    tx.commit()?;

    find_by_id(conn, id)?.ok_or_else(|| StoreError::not_found(format!("recipe {}", id)))
}

fn update_recipe(conn: &Connection, recipe: &Recipe) -> StoreResult<Recipe> {
    let tx = conn.unchecked_transaction()?;

    let changed = tx.execute(
        "UPDATE recipes SET title = ?2, description = ?3, cooking_time = ?4,
         local_video_path = ?5, thumbnail_path = ?6, video_file_id = ?7, source = ?8,
         external_id = ?9, search_text = ?10, updated_at = ?11
         WHERE id = ?1",
        params![
            recipe.id,
            recipe.title,
            recipe.description,
            recipe.cooking_time,
            recipe.local_video_path,
            recipe.thumbnail_path,
            recipe.video_file_id,
            recipe.source,
            recipe.external_id,
            recipe.search_text(),
            to_db_time(Utc::now()),
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found(format!("recipe {}", recipe.id)));
    }

    delete_children(&tx, recipe.id)?;
    insert_children(&tx, recipe.id, &recipe.ingredients, &recipe.steps, &recipe.tags)?;
    tx.commit()?;

    find_by_id(conn, recipe.id)?
        .ok_or_else(|| StoreError::not_found(format!("recipe {}", recipe.id)))
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn query_page(
    conn: &Connection,
    offset: u64,
    limit: u64,
    filter: &RecipeFilter,
) -> StoreResult<Page<RecipeSummary>> {
    let search = filter
        .search
        .as_deref()
        .map(normalize_search_text)
        .filter(|s| !s.trim().is_empty());

    let (where_clause, pattern) = match search {
        Some(term) => (
            "WHERE search_text LIKE ?1 ESCAPE '\\'",
            Some(like_pattern(&term)),
        ),
        None => ("", None),
    };

    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    if let Some(pattern) = pattern {
        param_values.push(Box::new(pattern));
    }

    // Count total matching rows.
    let count_sql = format!("SELECT COUNT(*) FROM recipes {}", where_clause);
    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    let total: i64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

    // An offset past i64::MAX cannot address any row.
    let Ok(offset) = i64::try_from(offset) else {
        return Ok(Page {
            items: Vec::new(),
            total: total.max(0) as u64,
        });
    };
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    // Fetch paginated results.
    param_values.push(Box::new(limit));
    param_values.push(Box::new(offset));
    let query_sql = format!(
        "SELECT {} FROM recipes {} ORDER BY created_at DESC, id DESC LIMIT ?{} OFFSET ?{}",
        RECIPE_COLUMNS,
        where_clause,
        param_values.len() - 1,
        param_values.len()
    );

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query_sql)?;
    let rows: Vec<RecipeRow> = stmt
        .query_map(params_ref.as_slice(), RecipeRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let tags = load_tags(conn, row.id)?;
        items.push(RecipeSummary::from(row.into_recipe(Vec::new(), Vec::new(), tags)?));
    }

    Ok(Page {
        items,
        total: total.max(0) as u64,
    })
}

fn reindex(conn: &Connection) -> StoreResult<usize> {
    let mut stmt = conn.prepare("SELECT id, title, description FROM recipes")?;
    let rows: Vec<(RecipeId, String, String)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare("UPDATE recipes SET search_text = ?2 WHERE id = ?1")?;
        for (id, title, description) in &rows {
            let text = normalize_search_text(&format!("{} {}", title, description));
            stmt.execute(params![id, text])?;
        }
    }
    tx.commit()?;

    Ok(rows.len())
}

// =============================================================================
// Async repository
// =============================================================================

#[async_trait]
impl RecipeRepository for SqliteStore {
    async fn find_by_natural_key(
        &self,
        source: &str,
        external_id: &str,
    ) -> StoreResult<Option<Recipe>> {
        let source = source.to_string();
        let external_id = external_id.to_string();
        self.db
            .run(move |conn| find_by_key(conn, &source, &external_id))
            .await
    }

    async fn create(&self, recipe: &NewRecipe) -> StoreResult<Recipe> {
        let recipe = recipe.clone();
        let created = self.db.run(move |conn| insert(conn, &recipe)).await?;
        info!(
            recipe_id = created.id,
            source = %created.source,
            external_id = %created.external_id,
            "Recipe stored"
        );
        Ok(created)
    }

    async fn get(&self, id: RecipeId) -> StoreResult<Option<Recipe>> {
        self.db.run(move |conn| find_by_id(conn, id)).await
    }

    async fn delete(&self, id: RecipeId) -> StoreResult<Option<Recipe>> {
        self.db
            .run(move |conn| {
                let Some(recipe) = find_by_id(conn, id)? else {
                    return Ok(None);
                };
                conn.execute("DELETE FROM recipes WHERE id = ?1", params![id])?;
                debug!(recipe_id = id, "Recipe deleted");
                Ok(Some(recipe))
            })
            .await
    }

    async fn list_page(
        &self,
        offset: u64,
        limit: u64,
        filter: &RecipeFilter,
    ) -> StoreResult<Page<RecipeSummary>> {
        let filter = filter.clone();
        self.db
            .run(move |conn| query_page(conn, offset, limit, &filter))
            .await
    }

    async fn update(&self, recipe: &Recipe) -> StoreResult<Recipe> {
        let recipe = recipe.clone();
        self.db.run(move |conn| update_recipe(conn, &recipe)).await
    }

    async fn reindex_search_text(&self) -> StoreResult<usize> {
        let count = self.db.run(reindex).await?;
        info!(count, "Recomputed recipe search text");
        Ok(count)
    }
}
