//! Post repository
//!
//! Database operations for posts.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! Every listing is ordered by primary key ascending, which is insertion order.

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{NewPost, Post, PostUpdate};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post and return it with its assigned id
    async fn create(&self, post: &NewPost) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get the first post (lowest id) with the given slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// List posts in insertion order
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Post>>;

    /// Count all posts
    async fn count(&self) -> Result<i64>;

    /// Replace every field of an existing post; `None` when the id is unknown
    async fn update(&self, id: i64, update: &PostUpdate) -> Result<Option<Post>>;

    /// Delete a post; returns whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &NewPost) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(sqlite(&self.pool)?, post).await,
            DatabaseDriver::Mysql => create_post_mysql(mysql(&self.pool)?, post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_by_id_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_post_by_id_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_by_slug_sqlite(sqlite(&self.pool)?, slug).await,
            DatabaseDriver::Mysql => get_post_by_slug_mysql(mysql(&self.pool)?, slug).await,
        }
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_posts_sqlite(sqlite(&self.pool)?, offset, limit).await,
            DatabaseDriver::Mysql => list_posts_mysql(mysql(&self.pool)?, offset, limit).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_posts_sqlite(sqlite(&self.pool)?).await,
            DatabaseDriver::Mysql => count_posts_mysql(mysql(&self.pool)?).await,
        }
    }

    async fn update(&self, id: i64, update: &PostUpdate) -> Result<Option<Post>> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => update_post_sqlite(sqlite(&self.pool)?, id, update).await?,
            DatabaseDriver::Mysql => update_post_mysql(mysql(&self.pool)?, id, update).await?,
        };

        if affected == 0 {
            // MySQL reports zero affected rows when nothing changed, so confirm by lookup
            return self.get_by_id(id).await;
        }

        Ok(Some(Post {
            id,
            title: update.title.clone(),
            slug: update.slug.clone(),
            content: update.content.clone(),
            image_ref: update.image_ref.clone(),
            published_at: update.published_at,
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_post_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => delete_post_mysql(mysql(&self.pool)?, id).await,
        }
    }
}

const SELECT_POST: &str = "SELECT id, title, slug, content, image_ref, published_at FROM posts";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &NewPost) -> Result<Post> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, slug, content, image_ref, published_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.content)
    .bind(&post.image_ref)
    .bind(post.published_at)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(post_from_new(result.last_insert_rowid(), post))
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_POST))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    Ok(row.as_ref().map(row_to_post_sqlite))
}

async fn get_post_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("{} WHERE slug = ? ORDER BY id ASC LIMIT 1", SELECT_POST))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by slug")?;

    Ok(row.as_ref().map(row_to_post_sqlite))
}

async fn list_posts_sqlite(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!("{} ORDER BY id ASC LIMIT ? OFFSET ?", SELECT_POST))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    Ok(rows.iter().map(row_to_post_sqlite).collect())
}

async fn count_posts_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM posts")
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok(row.get("count"))
}

async fn update_post_sqlite(pool: &SqlitePool, id: i64, update: &PostUpdate) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, slug = ?, content = ?, image_ref = ?, published_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.title)
    .bind(&update.slug)
    .bind(&update.content)
    .bind(&update.image_ref)
    .bind(update.published_at)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(result.rows_affected())
}

async fn delete_post_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        content: row.get("content"),
        image_ref: row.get("image_ref"),
        published_at: row.get("published_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &NewPost) -> Result<Post> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, slug, content, image_ref, published_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.content)
    .bind(&post.image_ref)
    .bind(post.published_at)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(post_from_new(result.last_insert_id() as i64, post))
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_POST))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    Ok(row.as_ref().map(row_to_post_mysql))
}

async fn get_post_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("{} WHERE slug = ? ORDER BY id ASC LIMIT 1", SELECT_POST))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by slug")?;

    Ok(row.as_ref().map(row_to_post_mysql))
}

async fn list_posts_mysql(pool: &MySqlPool, offset: i64, limit: i64) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!("{} ORDER BY id ASC LIMIT ? OFFSET ?", SELECT_POST))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    Ok(rows.iter().map(row_to_post_mysql).collect())
}

async fn count_posts_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM posts")
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok(row.get("count"))
}

async fn update_post_mysql(pool: &MySqlPool, id: i64, update: &PostUpdate) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, slug = ?, content = ?, image_ref = ?, published_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.title)
    .bind(&update.slug)
    .bind(&update.content)
    .bind(&update.image_ref)
    .bind(update.published_at)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(result.rows_affected())
}

async fn delete_post_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        content: row.get("content"),
        image_ref: row.get("image_ref"),
        published_at: row.get("published_at"),
    }
}

fn post_from_new(id: i64, post: &NewPost) -> Post {
    Post {
        id,
        title: post.title.clone(),
        slug: post.slug.clone(),
        content: post.content.clone(),
        image_ref: post.image_ref.clone(),
        published_at: post.published_at,
    }
}
