//! Subscription repository

use super::is_unique_violation;
use super::user::{row_to_user_mysql, row_to_user_sqlite};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Subscribe a user to an author. Returns false if already subscribed.
    async fn add(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Remove a subscription. Returns false if there was none.
    async fn remove(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Check whether a user follows an author
    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Authors a user follows, in subscription order, with the total count
    async fn list_authors(&self, user_id: i64, params: &ListParams) -> Result<(Vec<User>, i64)>;
}

/// SQLx-based subscription repository implementation
pub struct SqlxSubscriptionRepository {
    pool: DynDatabasePool,
}

impl SqlxSubscriptionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubscriptionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SubscriptionRepository for SqlxSubscriptionRepository {
    async fn add(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let query = "INSERT INTO subscriptions (user_id, author_id) VALUES (?, ?)";

        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(query)
                .bind(user_id)
                .bind(author_id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(query)
                .bind(user_id)
                .bind(author_id)
                .execute(self.pool.mysql()?)
                .await
                .map(|_| ()),
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e).context("Failed to create subscription"),
        }
    }

    async fn remove(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let query = "DELETE FROM subscriptions WHERE user_id = ? AND author_id = ?";

        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(query)
                .bind(user_id)
                .bind(author_id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete subscription")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(query)
                .bind(user_id)
                .bind(author_id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete subscription")?
                .rows_affected(),
        };

        Ok(affected > 0)
    }

    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let query = "SELECT COUNT(*) AS cnt FROM subscriptions WHERE user_id = ? AND author_id = ?";

        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(query)
                .bind(user_id)
                .bind(author_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to check subscription")?
                .try_get("cnt")?,
            DatabaseDriver::Mysql => sqlx::query(query)
                .bind(user_id)
                .bind(author_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to check subscription")?
                .try_get("cnt")?,
        };

        Ok(count > 0)
    }

    async fn list_authors(&self, user_id: i64, params: &ListParams) -> Result<(Vec<User>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_authors_sqlite(self.pool.sqlite()?, user_id, params).await,
            DatabaseDriver::Mysql => list_authors_mysql(self.pool.mysql()?, user_id, params).await,
        }
    }
}

const LIST_AUTHORS_SQL: &str = r#"
    SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.password_hash, u.created_at
    FROM subscriptions s
    INNER JOIN users u ON u.id = s.author_id
    WHERE s.user_id = ?
    ORDER BY s.id
    LIMIT ? OFFSET ?
"#;

const COUNT_AUTHORS_SQL: &str = "SELECT COUNT(*) AS cnt FROM subscriptions WHERE user_id = ?";

async fn list_authors_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    params: &ListParams,
) -> Result<(Vec<User>, i64)> {
    let rows = sqlx::query(LIST_AUTHORS_SQL)
        .bind(user_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list subscriptions")?;

    let total: i64 = sqlx::query(COUNT_AUTHORS_SQL)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .context("Failed to count subscriptions")?
        .try_get("cnt")?;

    let authors = rows.iter().map(row_to_user_sqlite).collect::<Result<Vec<_>>>()?;
    Ok((authors, total))
}

async fn list_authors_mysql(
    pool: &MySqlPool,
    user_id: i64,
    params: &ListParams,
) -> Result<(Vec<User>, i64)> {
    let rows = sqlx::query(LIST_AUTHORS_SQL)
        .bind(user_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list subscriptions")?;

    let total: i64 = sqlx::query(COUNT_AUTHORS_SQL)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .context("Failed to count subscriptions")?
        .try_get("cnt")?;

    let authors = rows.iter().map(row_to_user_mysql).collect::<Result<Vec<_>>>()?;
    Ok((authors, total))
}
