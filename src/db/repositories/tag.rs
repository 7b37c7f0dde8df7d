//! Tag repository
//!
//! Database operations for tags.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL

use super::is_unique_violation;
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateTagInput, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Insert a tag unless one with the same name or slug exists.
    ///
    /// Returns `None` when the row already existed.
    async fn insert_if_absent(&self, input: &CreateTagInput) -> Result<Option<Tag>>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Get tags linked to a recipe, ordered by name
    async fn get_by_recipe_id(&self, recipe_id: i64) -> Result<Vec<Tag>>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn insert_if_absent(&self, input: &CreateTagInput) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => insert_tag_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => insert_tag_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_tag_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_by_slug_sqlite(self.pool.sqlite()?, slug).await,
            DatabaseDriver::Mysql => get_tag_by_slug_mysql(self.pool.mysql()?, slug).await,
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_tags_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_tags_mysql(self.pool.mysql()?).await,
        }
    }

    async fn get_by_recipe_id(&self, recipe_id: i64) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tags_by_recipe_sqlite(self.pool.sqlite()?, recipe_id).await
            }
            DatabaseDriver::Mysql => {
                get_tags_by_recipe_mysql(self.pool.mysql()?, recipe_id).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn insert_tag_sqlite(pool: &SqlitePool, input: &CreateTagInput) -> Result<Option<Tag>> {
    let result = sqlx::query("INSERT INTO tags (name, color, slug) VALUES (?, ?, ?)")
        .bind(&input.name)
        .bind(&input.color)
        .bind(&input.slug)
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(Some(Tag {
            id: done.last_insert_rowid(),
            name: input.name.clone(),
            color: input.color.clone(),
            slug: input.slug.clone(),
        })),
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(e).context("Failed to create tag"),
    }
}

async fn get_tag_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_tag_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_tags_sqlite(pool: &SqlitePool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, name, color, slug FROM tags ORDER BY name, id")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    let mut tags = Vec::new();
    for row in rows {
        tags.push(row_to_tag_sqlite(&row)?);
    }

    Ok(tags)
}

async fn get_tags_by_recipe_sqlite(pool: &SqlitePool, recipe_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.color, t.slug
        FROM tags t
        INNER JOIN recipe_tags rt ON t.id = rt.tag_id
        WHERE rt.recipe_id = ?
        ORDER BY t.name, t.id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .context("Failed to get tags for recipe")?;

    let mut tags = Vec::new();
    for row in rows {
        tags.push(row_to_tag_sqlite(&row)?);
    }

    Ok(tags)
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        color: row.try_get("color")?,
        slug: row.try_get("slug")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn insert_tag_mysql(pool: &MySqlPool, input: &CreateTagInput) -> Result<Option<Tag>> {
    let result = sqlx::query("INSERT INTO tags (name, color, slug) VALUES (?, ?, ?)")
        .bind(&input.name)
        .bind(&input.color)
        .bind(&input.slug)
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(Some(Tag {
            id: done.last_insert_id() as i64,
            name: input.name.clone(),
            color: input.color.clone(),
            slug: input.slug.clone(),
        })),
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(e).context("Failed to create tag"),
    }
}

async fn get_tag_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_tag_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_tags_mysql(pool: &MySqlPool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, name, color, slug FROM tags ORDER BY name, id")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    let mut tags = Vec::new();
    for row in rows {
        tags.push(row_to_tag_mysql(&row)?);
    }

    Ok(tags)
}

async fn get_tags_by_recipe_mysql(pool: &MySqlPool, recipe_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.color, t.slug
        FROM tags t
        INNER JOIN recipe_tags rt ON t.id = rt.tag_id
        WHERE rt.recipe_id = ?
        ORDER BY t.name, t.id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .context("Failed to get tags for recipe")?;

    let mut tags = Vec::new();
    for row in rows {
        tags.push(row_to_tag_mysql(&row)?);
    }

    Ok(tags)
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        color: row.try_get("color")?,
        slug: row.try_get("slug")?,
    })
}
