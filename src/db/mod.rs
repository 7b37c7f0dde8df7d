//! Database layer
//!
//! Storage for the Foodgram backend. It supports:
//! - SQLite (default, single-file deployment and in-memory tests)
//! - MySQL (for larger deployments)
//!
//! The database driver is selected based on configuration. Repositories hold a
//! [`DynDatabasePool`] and dispatch to per-dialect query functions.
//!
//! # Usage
//!
//! ```ignore
//! use foodgram::config::DatabaseConfig;
//! use foodgram::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
