//! Auth token repository
//!
//! Tokens are provisioned out of band; the API only looks them up. `create`
//! exists for provisioning tooling and tests.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::AuthToken;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Auth token repository trait
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Store a token for a user
    async fn create(&self, user_id: i64, token: &str) -> Result<AuthToken>;

    /// Look up a token by its key
    async fn get(&self, token: &str) -> Result<Option<AuthToken>>;

    /// Delete every token owned by a user
    async fn delete_by_user(&self, user_id: i64) -> Result<u64>;
}

/// SQLx-based token repository implementation
pub struct SqlxTokenRepository {
    pool: DynDatabasePool,
}

impl SqlxTokenRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TokenRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TokenRepository for SqlxTokenRepository {
    async fn create(&self, user_id: i64, token: &str) -> Result<AuthToken> {
        let now = Utc::now();
        let query = "INSERT INTO auth_tokens (token, user_id, created_at) VALUES (?, ?, ?)";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(query)
                    .bind(token)
                    .bind(user_id)
                    .bind(now)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to create auth token")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(query)
                    .bind(token)
                    .bind(user_id)
                    .bind(now)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to create auth token")?;
            }
        }

        Ok(AuthToken {
            token: token.to_string(),
            user_id,
            created_at: now,
        })
    }

    async fn get(&self, token: &str) -> Result<Option<AuthToken>> {
        let query = "SELECT token, user_id, created_at FROM auth_tokens WHERE token = ?";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(query)
                    .bind(token)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get auth token")?;

                row.map(|row| -> Result<AuthToken> {
                    Ok(AuthToken {
                        token: row.try_get("token")?,
                        user_id: row.try_get("user_id")?,
                        created_at: row.try_get("created_at")?,
                    })
                })
                .transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(query)
                    .bind(token)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get auth token")?;

                row.map(|row| -> Result<AuthToken> {
                    Ok(AuthToken {
                        token: row.try_get("token")?,
                        user_id: row.try_get("user_id")?,
                        created_at: row.try_get("created_at")?,
                    })
                })
                .transpose()
            }
        }
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<u64> {
        let query = "DELETE FROM auth_tokens WHERE user_id = ?";

        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(query)
                .bind(user_id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete auth tokens")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(query)
                .bind(user_id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete auth tokens")?
                .rows_affected(),
        };

        Ok(result)
    }
}
