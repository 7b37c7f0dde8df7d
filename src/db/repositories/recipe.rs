//! Recipe repository
//!
//! Database operations for the recipe aggregate.
//!
//! Writes replace the whole aggregate (header, ingredient rows, tag links)
//! inside a single transaction, so readers never observe a recipe with a
//! partial ingredient list.

use super::{placeholders, BindValue};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, NewRecipe, Recipe, RecipeFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Recipe repository trait
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Insert a recipe with its ingredient rows and tag links
    async fn create(&self, recipe: &NewRecipe) -> Result<Recipe>;

    /// Replace a recipe's header, ingredient rows and tag links.
    /// The author is never changed.
    async fn update(&self, id: i64, recipe: &NewRecipe) -> Result<Recipe>;

    /// Get recipe by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>>;

    /// Delete a recipe. Returns false when it did not exist.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// List recipes newest first.
    ///
    /// Favorite and cart filters apply only when `viewer_id` is known.
    async fn list(
        &self,
        filter: &RecipeFilter,
        viewer_id: Option<i64>,
        params: &ListParams,
    ) -> Result<(Vec<Recipe>, i64)>;

    /// Newest recipes by an author, optionally limited
    async fn list_by_author(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<Recipe>>;

    /// Number of recipes by an author
    async fn count_by_author(&self, author_id: i64) -> Result<i64>;
}

/// SQLx-based recipe repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxRecipeRepository {
    pool: DynDatabasePool,
}

impl SqlxRecipeRepository {
    /// Create a new SQLx recipe repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RecipeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RecipeRepository for SqlxRecipeRepository {
    async fn create(&self, recipe: &NewRecipe) -> Result<Recipe> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_recipe_sqlite(self.pool.sqlite()?, recipe).await,
            DatabaseDriver::Mysql => create_recipe_mysql(self.pool.mysql()?, recipe).await,
        }
    }

    async fn update(&self, id: i64, recipe: &NewRecipe) -> Result<Recipe> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_recipe_sqlite(self.pool.sqlite()?, id, recipe).await,
            DatabaseDriver::Mysql => update_recipe_mysql(self.pool.mysql()?, id, recipe).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>> {
        let query = format!("SELECT {} FROM recipes r WHERE r.id = ?", RECIPE_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&query)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get recipe by ID")?
                .as_ref()
                .map(row_to_recipe_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&query)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get recipe by ID")?
                .as_ref()
                .map(row_to_recipe_mysql)
                .transpose(),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // Ingredient rows, tag links, favorites and cart entries cascade.
        let query = "DELETE FROM recipes WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(query)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete recipe")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(query)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete recipe")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list(
        &self,
        filter: &RecipeFilter,
        viewer_id: Option<i64>,
        params: &ListParams,
    ) -> Result<(Vec<Recipe>, i64)> {
        let (where_clause, binds) = recipe_filter_clause(filter, viewer_id);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_recipes_sqlite(self.pool.sqlite()?, &where_clause, &binds, params).await
            }
            DatabaseDriver::Mysql => {
                list_recipes_mysql(self.pool.mysql()?, &where_clause, &binds, params).await
            }
        }
    }

    async fn list_by_author(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<Recipe>> {
        let filter = RecipeFilter {
            author: Some(author_id),
            ..RecipeFilter::default()
        };
        let (where_clause, binds) = recipe_filter_clause(&filter, None);
        // MySQL has no LIMIT-less form with OFFSET, so "all" is i64::MAX.
        let limit = limit.unwrap_or(i64::MAX).max(0);
        let params = RawPage { limit, offset: 0 };

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_recipes_sqlite(self.pool.sqlite()?, &where_clause, &binds, params).await
            }
            DatabaseDriver::Mysql => {
                fetch_recipes_mysql(self.pool.mysql()?, &where_clause, &binds, params).await
            }
        }
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        let query = "SELECT COUNT(*) AS cnt FROM recipes WHERE author_id = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(query)
                .bind(author_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count recipes")?
                .try_get("cnt")?,
            DatabaseDriver::Mysql => sqlx::query(query)
                .bind(author_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count recipes")?
                .try_get("cnt")?,
        };
        Ok(count)
    }
}

const RECIPE_COLUMNS: &str =
    "r.id, r.author_id, r.name, r.text, r.image, r.cooking_time, r.created_at";

const RECIPE_ORDER: &str = "ORDER BY r.created_at DESC, r.id DESC";

#[derive(Debug, Clone, Copy)]
struct RawPage {
    limit: i64,
    offset: i64,
}

/// Build the WHERE clause and its bind values for a recipe list query
fn recipe_filter_clause(filter: &RecipeFilter, viewer_id: Option<i64>) -> (String, Vec<BindValue>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(author) = filter.author {
        conditions.push("r.author_id = ?".to_string());
        binds.push(BindValue::Int(author));
    }

    if !filter.tags.is_empty() {
        conditions.push(format!(
            "r.id IN (SELECT rt.recipe_id FROM recipe_tags rt \
             INNER JOIN tags t ON t.id = rt.tag_id WHERE t.slug IN ({}))",
            placeholders(filter.tags.len())
        ));
        binds.extend(filter.tags.iter().cloned().map(BindValue::Text));
    }

    if let Some(viewer) = viewer_id {
        if filter.is_favorited {
            conditions.push("r.id IN (SELECT f.recipe_id FROM favorites f WHERE f.user_id = ?)".to_string());
            binds.push(BindValue::Int(viewer));
        }
        if filter.is_in_shopping_cart {
            conditions.push(
                "r.id IN (SELECT c.recipe_id FROM shopping_carts c WHERE c.user_id = ?)".to_string(),
            );
            binds.push(BindValue::Int(viewer));
        }
    }

    if conditions.is_empty() {
        (String::new(), binds)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), binds)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_recipe_sqlite(pool: &SqlitePool, recipe: &NewRecipe) -> Result<Recipe> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(
        r#"
        INSERT INTO recipes (author_id, name, text, image, cooking_time, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(recipe.author_id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(&recipe.image)
    .bind(recipe.cooking_time)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create recipe")?
    .last_insert_rowid();

    for item in &recipe.ingredients {
        sqlx::query("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?, ?, ?)")
            .bind(id)
            .bind(item.id)
            .bind(item.amount)
            .execute(&mut *tx)
            .await
            .context("Failed to add recipe ingredient")?;
    }

    for tag_id in &recipe.tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(id)
            .bind(*tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to add recipe tag")?;
    }

    tx.commit().await.context("Failed to commit recipe")?;

    Ok(Recipe {
        id,
        author_id: recipe.author_id,
        name: recipe.name.clone(),
        text: recipe.text.clone(),
        image: recipe.image.clone(),
        cooking_time: recipe.cooking_time,
        created_at: now,
    })
}

async fn update_recipe_sqlite(pool: &SqlitePool, id: i64, recipe: &NewRecipe) -> Result<Recipe> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("UPDATE recipes SET name = ?, text = ?, image = ?, cooking_time = ? WHERE id = ?")
        .bind(&recipe.name)
        .bind(&recipe.text)
        .bind(&recipe.image)
        .bind(recipe.cooking_time)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update recipe")?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe ingredients")?;

    for item in &recipe.ingredients {
        sqlx::query("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?, ?, ?)")
            .bind(id)
            .bind(item.id)
            .bind(item.amount)
            .execute(&mut *tx)
            .await
            .context("Failed to add recipe ingredient")?;
    }

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe tags")?;

    for tag_id in &recipe.tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(id)
            .bind(*tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to add recipe tag")?;
    }

    let row = sqlx::query(&format!("SELECT {} FROM recipes r WHERE r.id = ?", RECIPE_COLUMNS))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to reload recipe")?;
    let updated = row_to_recipe_sqlite(&row)?;

    tx.commit().await.context("Failed to commit recipe")?;

    Ok(updated)
}

async fn list_recipes_sqlite(
    pool: &SqlitePool,
    where_clause: &str,
    binds: &[BindValue],
    params: &ListParams,
) -> Result<(Vec<Recipe>, i64)> {
    let count_sql = format!("SELECT COUNT(*) AS cnt FROM recipes r {}", where_clause);
    let mut count_query = sqlx::query(&count_sql);
    for value in binds {
        count_query = match value {
            BindValue::Int(v) => count_query.bind(*v),
            BindValue::Text(s) => count_query.bind(s.as_str()),
        };
    }
    let total: i64 = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count recipes")?
        .try_get("cnt")?;

    let page = RawPage {
        limit: params.limit(),
        offset: params.offset(),
    };
    let recipes = fetch_recipes_sqlite(pool, where_clause, binds, page).await?;

    Ok((recipes, total))
}

async fn fetch_recipes_sqlite(
    pool: &SqlitePool,
    where_clause: &str,
    binds: &[BindValue],
    page: RawPage,
) -> Result<Vec<Recipe>> {
    let sql = format!(
        "SELECT {} FROM recipes r {} {} LIMIT ? OFFSET ?",
        RECIPE_COLUMNS, where_clause, RECIPE_ORDER
    );
    let mut query = sqlx::query(&sql);
    for value in binds {
        query = match value {
            BindValue::Int(v) => query.bind(*v),
            BindValue::Text(s) => query.bind(s.as_str()),
        };
    }

    let rows = query
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
        .context("Failed to list recipes")?;

    rows.iter().map(row_to_recipe_sqlite).collect()
}

fn row_to_recipe_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Recipe> {
    Ok(Recipe {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        name: row.try_get("name")?,
        text: row.try_get("text")?,
        image: row.try_get("image")?,
        cooking_time: row.try_get("cooking_time")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_recipe_mysql(pool: &MySqlPool, recipe: &NewRecipe) -> Result<Recipe> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(
        r#"
        INSERT INTO recipes (author_id, name, text, image, cooking_time, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(recipe.author_id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(&recipe.image)
    .bind(recipe.cooking_time)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create recipe")?
    .last_insert_id() as i64;

    for item in &recipe.ingredients {
        sqlx::query("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?, ?, ?)")
            .bind(id)
            .bind(item.id)
            .bind(item.amount)
            .execute(&mut *tx)
            .await
            .context("Failed to add recipe ingredient")?;
    }

    for tag_id in &recipe.tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(id)
            .bind(*tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to add recipe tag")?;
    }

    tx.commit().await.context("Failed to commit recipe")?;

    Ok(Recipe {
        id,
        author_id: recipe.author_id,
        name: recipe.name.clone(),
        text: recipe.text.clone(),
        image: recipe.image.clone(),
        cooking_time: recipe.cooking_time,
        created_at: now,
    })
}

async fn update_recipe_mysql(pool: &MySqlPool, id: i64, recipe: &NewRecipe) -> Result<Recipe> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("UPDATE recipes SET name = ?, text = ?, image = ?, cooking_time = ? WHERE id = ?")
        .bind(&recipe.name)
        .bind(&recipe.text)
        .bind(&recipe.image)
        .bind(recipe.cooking_time)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update recipe")?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe ingredients")?;

    for item in &recipe.ingredients {
        sqlx::query("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?, ?, ?)")
            .bind(id)
            .bind(item.id)
            .bind(item.amount)
            .execute(&mut *tx)
            .await
            .context("Failed to add recipe ingredient")?;
    }

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe tags")?;

    for tag_id in &recipe.tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(id)
            .bind(*tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to add recipe tag")?;
    }

    let row = sqlx::query(&format!("SELECT {} FROM recipes r WHERE r.id = ?", RECIPE_COLUMNS))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to reload recipe")?;
    let updated = row_to_recipe_mysql(&row)?;

    tx.commit().await.context("Failed to commit recipe")?;

    Ok(updated)
}

async fn list_recipes_mysql(
    pool: &MySqlPool,
    where_clause: &str,
    binds: &[BindValue],
    params: &ListParams,
) -> Result<(Vec<Recipe>, i64)> {
    let count_sql = format!("SELECT COUNT(*) AS cnt FROM recipes r {}", where_clause);
    let mut count_query = sqlx::query(&count_sql);
    for value in binds {
        count_query = match value {
            BindValue::Int(v) => count_query.bind(*v),
            BindValue::Text(s) => count_query.bind(s.as_str()),
        };
    }
    let total: i64 = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count recipes")?
        .try_get("cnt")?;

    let page = RawPage {
        limit: params.limit(),
        offset: params.offset(),
    };
    let recipes = fetch_recipes_mysql(pool, where_clause, binds, page).await?;

    Ok((recipes, total))
}

async fn fetch_recipes_mysql(
    pool: &MySqlPool,
    where_clause: &str,
    binds: &[BindValue],
    page: RawPage,
) -> Result<Vec<Recipe>> {
    let sql = format!(
        "SELECT {} FROM recipes r {} {} LIMIT ? OFFSET ?",
        RECIPE_COLUMNS, where_clause, RECIPE_ORDER
    );
    let mut query = sqlx::query(&sql);
    for value in binds {
        query = match value {
            BindValue::Int(v) => query.bind(*v),
            BindValue::Text(s) => query.bind(s.as_str()),
        };
    }

    let rows = query
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
        .context("Failed to list recipes")?;

    rows.iter().map(row_to_recipe_mysql).collect()
}

fn row_to_recipe_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Recipe> {
    Ok(Recipe {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        name: row.try_get("name")?,
        text: row.try_get("text")?,
        image: row.try_get("image")?,
        cooking_time: row.try_get::<i32, _>("cooking_time")? as i64,
        created_at: row.try_get("created_at")?,
    })
}
