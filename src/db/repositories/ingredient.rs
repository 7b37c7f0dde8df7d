//! Ingredient repository
//!
//! Catalog lookups plus the joined ingredient rows of a recipe.

use super::is_unique_violation;
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateIngredientInput, Ingredient, RecipeIngredient};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Ingredient repository trait
#[async_trait]
pub trait IngredientRepository: Send + Sync {
    /// Insert an ingredient unless the (name, unit) pair exists.
    ///
    /// Returns `None` when the row already existed.
    async fn insert_if_absent(
        &self,
        input: &CreateIngredientInput,
    ) -> Result<Option<Ingredient>>;

    /// Get ingredient by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>>;

    /// Case-insensitive name prefix search ordered by name.
    /// `None` lists the whole catalog.
    async fn search(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>>;

    /// Ingredient rows of a recipe joined with the catalog, ordered by name
    async fn get_by_recipe_id(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>>;
}

/// SQLx-based ingredient repository implementation
pub struct SqlxIngredientRepository {
    pool: DynDatabasePool,
}

impl SqlxIngredientRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn IngredientRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl IngredientRepository for SqlxIngredientRepository {
    async fn insert_if_absent(
        &self,
        input: &CreateIngredientInput,
    ) -> Result<Option<Ingredient>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => insert_ingredient_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => insert_ingredient_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>> {
        let query = "SELECT id, name, measurement_unit FROM ingredients WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(query)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get ingredient by ID")?
                .as_ref()
                .map(row_to_ingredient_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(query)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get ingredient by ID")?
                .as_ref()
                .map(row_to_ingredient_mysql)
                .transpose(),
        }
    }

    async fn search(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => search_ingredients_sqlite(self.pool.sqlite()?, prefix).await,
            DatabaseDriver::Mysql => search_ingredients_mysql(self.pool.mysql()?, prefix).await,
        }
    }

    async fn get_by_recipe_id(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>> {
        let query = r#"
            SELECT i.id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ?
            ORDER BY i.name, i.id
        "#;

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(query)
                    .bind(recipe_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to get recipe ingredients")?;
                rows.iter()
                    .map(|row| -> Result<RecipeIngredient> {
                        Ok(RecipeIngredient {
                            id: row.try_get("id")?,
                            name: row.try_get("name")?,
                            measurement_unit: row.try_get("measurement_unit")?,
                            amount: row.try_get("amount")?,
                        })
                    })
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(query)
                    .bind(recipe_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to get recipe ingredients")?;
                rows.iter()
                    .map(|row| -> Result<RecipeIngredient> {
                        Ok(RecipeIngredient {
                            id: row.try_get("id")?,
                            name: row.try_get("name")?,
                            measurement_unit: row.try_get("measurement_unit")?,
                            amount: row.try_get::<i32, _>("amount")? as i64,
                        })
                    })
                    .collect()
            }
        }
    }
}

/// Escape LIKE wildcards in user input; `!` is the escape character.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '!' | '%' | '_') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn insert_ingredient_sqlite(
    pool: &SqlitePool,
    input: &CreateIngredientInput,
) -> Result<Option<Ingredient>> {
    let result = sqlx::query("INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)")
        .bind(&input.name)
        .bind(&input.measurement_unit)
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(Some(Ingredient {
            id: done.last_insert_rowid(),
            name: input.name.clone(),
            measurement_unit: input.measurement_unit.clone(),
        })),
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(e).context("Failed to create ingredient"),
    }
}

async fn search_ingredients_sqlite(
    pool: &SqlitePool,
    prefix: Option<&str>,
) -> Result<Vec<Ingredient>> {
    let rows = sqlx::query("SELECT id, name, measurement_unit FROM ingredients ORDER BY name, id")
        .fetch_all(pool)
        .await
        .context("Failed to search ingredients")?;

    let ingredients = rows
        .iter()
        .map(row_to_ingredient_sqlite)
        .collect::<Result<Vec<_>>>()?;

    // SQLite's LIKE and LOWER only fold ASCII, so match in Rust.
    Ok(match prefix {
        Some(prefix) if !prefix.is_empty() => {
            let prefix = prefix.to_lowercase();
            ingredients
                .into_iter()
                .filter(|i| i.name.to_lowercase().starts_with(&prefix))
                .collect()
        }
        _ => ingredients,
    })
}

fn row_to_ingredient_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Ingredient> {
    Ok(Ingredient {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        measurement_unit: row.try_get("measurement_unit")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn insert_ingredient_mysql(
    pool: &MySqlPool,
    input: &CreateIngredientInput,
) -> Result<Option<Ingredient>> {
    let result = sqlx::query("INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)")
        .bind(&input.name)
        .bind(&input.measurement_unit)
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(Some(Ingredient {
            id: done.last_insert_id() as i64,
            name: input.name.clone(),
            measurement_unit: input.measurement_unit.clone(),
        })),
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(e).context("Failed to create ingredient"),
    }
}

async fn search_ingredients_mysql(
    pool: &MySqlPool,
    prefix: Option<&str>,
) -> Result<Vec<Ingredient>> {
    let rows = match prefix {
        Some(prefix) if !prefix.is_empty() => {
            sqlx::query(
                r#"
                SELECT id, name, measurement_unit
                FROM ingredients
                WHERE LOWER(name) LIKE ? ESCAPE '!'
                ORDER BY name, id
                "#,
            )
            .bind(format!("{}%", escape_like(&prefix.to_lowercase())))
            .fetch_all(pool)
            .await
        }
        _ => {
            sqlx::query("SELECT id, name, measurement_unit FROM ingredients ORDER BY name, id")
                .fetch_all(pool)
                .await
        }
    }
    .context("Failed to search ingredients")?;

    rows.iter().map(row_to_ingredient_mysql).collect()
}

fn row_to_ingredient_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Ingredient> {
    Ok(Ingredient {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        measurement_unit: row.try_get("measurement_unit")?,
    })
}
