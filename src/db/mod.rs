//! Database layer
//!
//! This module provides database abstraction for the Technify blog.
//! It supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for hosted deployments)
//!
//! # Usage
//!
//! ```ignore
//! use technify::config::DatabaseConfig;
//! use technify::db::{create_pool, migrations};
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
