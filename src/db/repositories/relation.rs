//! Favorite and shopping cart repository
//!
//! Both lists are (user, recipe) join tables with a unique key on the pair.
//! Duplicate inserts are detected through that key, not a prior lookup.

use super::is_unique_violation;
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CartIngredientRow, RecipeListKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Repository for per-user recipe lists
#[async_trait]
pub trait RecipeRelationRepository: Send + Sync {
    /// Add a recipe to a user's list. Returns false if it was already there.
    async fn add(&self, kind: RecipeListKind, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Remove a recipe from a user's list. Returns false if it was not there.
    async fn remove(&self, kind: RecipeListKind, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Check whether a recipe is on a user's list
    async fn contains(&self, kind: RecipeListKind, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Every ingredient row of every recipe in the user's shopping cart
    async fn cart_ingredient_rows(&self, user_id: i64) -> Result<Vec<CartIngredientRow>>;
}

/// SQLx-based relation repository implementation
pub struct SqlxRecipeRelationRepository {
    pool: DynDatabasePool,
}

impl SqlxRecipeRelationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RecipeRelationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RecipeRelationRepository for SqlxRecipeRelationRepository {
    async fn add(&self, kind: RecipeListKind, user_id: i64, recipe_id: i64) -> Result<bool> {
        let query = format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES (?, ?)",
            kind.table()
        );

        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&query)
                .bind(user_id)
                .bind(recipe_id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(&query)
                .bind(user_id)
                .bind(recipe_id)
                .execute(self.pool.mysql()?)
                .await
                .map(|_| ()),
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to add recipe to {}", kind)),
        }
    }

    async fn remove(&self, kind: RecipeListKind, user_id: i64, recipe_id: i64) -> Result<bool> {
        let query = format!(
            "DELETE FROM {} WHERE user_id = ? AND recipe_id = ?",
            kind.table()
        );

        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&query)
                .bind(user_id)
                .bind(recipe_id)
                .execute(self.pool.sqlite()?)
                .await
                .with_context(|| format!("Failed to remove recipe from {}", kind))?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(&query)
                .bind(user_id)
                .bind(recipe_id)
                .execute(self.pool.mysql()?)
                .await
                .with_context(|| format!("Failed to remove recipe from {}", kind))?
                .rows_affected(),
        };

        Ok(affected > 0)
    }

    async fn contains(&self, kind: RecipeListKind, user_id: i64, recipe_id: i64) -> Result<bool> {
        let query = format!(
            "SELECT COUNT(*) AS cnt FROM {} WHERE user_id = ? AND recipe_id = ?",
            kind.table()
        );

        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&query)
                .bind(user_id)
                .bind(recipe_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .with_context(|| format!("Failed to check {}", kind))?
                .try_get("cnt")?,
            DatabaseDriver::Mysql => sqlx::query(&query)
                .bind(user_id)
                .bind(recipe_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .with_context(|| format!("Failed to check {}", kind))?
                .try_get("cnt")?,
        };

        Ok(count > 0)
    }

    async fn cart_ingredient_rows(&self, user_id: i64) -> Result<Vec<CartIngredientRow>> {
        // Summing happens in Rust so totals never depend on dialect integer widths.
        let query = r#"
            SELECT i.name, i.measurement_unit, ri.amount
            FROM shopping_carts c
            INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE c.user_id = ?
        "#;

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(query)
                    .bind(user_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to load shopping cart ingredients")?;
                rows.iter()
                    .map(|row| -> Result<CartIngredientRow> {
                        Ok(CartIngredientRow {
                            name: row.try_get("name")?,
                            measurement_unit: row.try_get("measurement_unit")?,
                            amount: row.try_get("amount")?,
                        })
                    })
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(query)
                    .bind(user_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to load shopping cart ingredients")?;
                rows.iter()
                    .map(|row| -> Result<CartIngredientRow> {
                        Ok(CartIngredientRow {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (DynDatabasePool, SqlxRecipeRelationRepository) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let sqlite = pool.sqlite().unwrap();
        for statement in [
            "INSERT INTO users (email, username, first_name, last_name, password_hash) VALUES ('a@x.io', 'a', 'A', 'A', 'h')",
            "INSERT INTO users (email, username, first_name, last_name, password_hash) VALUES ('b@x.io', 'b', 'B', 'B', 'h')",
            "INSERT INTO ingredients (name, measurement_unit) VALUES ('Salt', 'g')",
            "INSERT INTO ingredients (name, measurement_unit) VALUES ('Milk', 'ml')",
            "INSERT INTO recipes (author_id, name, text, cooking_time) VALUES (1, 'Soup', 'T', 5)",
            "INSERT INTO recipes (author_id, name, text, cooking_time) VALUES (1, 'Stew', 'T', 5)",
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (1, 1, 5)",
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (2, 1, 10)",
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (2, 2, 200)",
        ] {
            sqlx::query(statement).execute(sqlite).await.unwrap();
        }

        let repo = SqlxRecipeRelationRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_add_twice_reports_duplicate() {
        let (_pool, repo) = setup().await;

        assert!(repo.add(RecipeListKind::Favorite, 2, 1).await.unwrap());
        assert!(!repo.add(RecipeListKind::Favorite, 2, 1).await.unwrap());
        assert!(repo.contains(RecipeListKind::Favorite, 2, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_lists_are_independent() {
        let (_pool, repo) = setup().await;

        repo.add(RecipeListKind::Favorite, 2, 1).await.unwrap();

        assert!(!repo.contains(RecipeListKind::ShoppingCart, 2, 1).await.unwrap());
        assert!(repo.add(RecipeListKind::ShoppingCart, 2, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_missing_reports_false() {
        let (_pool, repo) = setup().await;

        assert!(!repo.remove(RecipeListKind::ShoppingCart, 2, 1).await.unwrap());

        repo.add(RecipeListKind::ShoppingCart, 2, 1).await.unwrap();
        assert!(repo.remove(RecipeListKind::ShoppingCart, 2, 1).await.unwrap());
        assert!(!repo.contains(RecipeListKind::ShoppingCart, 2, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_unknown_recipe_is_error() {
        let (_pool, repo) = setup().await;
        assert!(repo.add(RecipeListKind::Favorite, 2, 999).await.is_err());
    }

    #[tokio::test]
    async fn test_cart_ingredient_rows() {
        let (_pool, repo) = setup().await;
        repo.add(RecipeListKind::ShoppingCart, 2, 1).await.unwrap();
        repo.add(RecipeListKind::ShoppingCart, 2, 2).await.unwrap();
        repo.add(RecipeListKind::Favorite, 1, 1).await.unwrap();

        let mut rows = repo.cart_ingredient_rows(2).await.unwrap();
        rows.sort_by(|a, b| (&a.name, a.amount).cmp(&(&b.name, b.amount)));

        let summary: Vec<(String, i64)> = rows.into_iter().map(|r| (r.name, r.amount)).collect();
        assert_eq!(
            summary,
            vec![
                ("Milk".to_string(), 200),
                ("Salt".to_string(), 5),
                ("Salt".to_string(), 10),
            ]
        );

        assert!(repo.cart_ingredient_rows(1).await.unwrap().is_empty());
    }
}
