//! Contact message repository
//!
//! Contact messages are append-only: the blog stores them and never edits them.

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{ContactMessage, NewContactMessage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Contact repository trait
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Store a new contact message
    async fn create(&self, message: &NewContactMessage) -> Result<ContactMessage>;

    /// Count stored messages
    async fn count(&self) -> Result<i64>;

    /// List messages, newest first
    async fn list(&self, limit: i64) -> Result<Vec<ContactMessage>>;
}

/// SQLx-based contact repository implementation
pub struct SqlxContactRepository {
    pool: DynDatabasePool,
}

impl SqlxContactRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContactRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContactRepository for SqlxContactRepository {
    async fn create(&self, message: &NewContactMessage) -> Result<ContactMessage> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_contact_sqlite(sqlite(&self.pool)?, message).await?
            }
            DatabaseDriver::Mysql => insert_contact_mysql(mysql(&self.pool)?, message).await?,
        };

        Ok(ContactMessage {
            id,
            name: message.name.clone(),
            email: message.email.clone(),
            phone: message.phone.clone(),
            message: message.message.clone(),
            submitted_at: message.submitted_at,
        })
    }

    async fn count(&self) -> Result<i64> {
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("SELECT COUNT(*) AS count FROM contacts")
                .fetch_one(sqlite(&self.pool)?)
                .await
                .map(|row| row.get::<i64, _>("count")),
            DatabaseDriver::Mysql => sqlx::query("SELECT COUNT(*) AS count FROM contacts")
                .fetch_one(mysql(&self.pool)?)
                .await
                .map(|row| row.get::<i64, _>("count")),
        };

        row.context("Failed to count contact messages")
    }

    async fn list(&self, limit: i64) -> Result<Vec<ContactMessage>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_contacts_sqlite(sqlite(&self.pool)?, limit).await,
            DatabaseDriver::Mysql => list_contacts_mysql(mysql(&self.pool)?, limit).await,
        }
    }
}

const INSERT_CONTACT: &str = r#"
    INSERT INTO contacts (name, email, phone, message, submitted_at)
    VALUES (?, ?, ?, ?, ?)
"#;

const LIST_CONTACTS: &str = r#"
    SELECT id, name, email, phone, message, submitted_at
    FROM contacts
    ORDER BY id DESC
    LIMIT ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn insert_contact_sqlite(pool: &SqlitePool, message: &NewContactMessage) -> Result<i64> {
    let result = sqlx::query(INSERT_CONTACT)
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.phone)
        .bind(&message.message)
        .bind(message.submitted_at)
        .execute(pool)
        .await
        .context("Failed to store contact message")?;

    Ok(result.last_insert_rowid())
}

async fn list_contacts_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<ContactMessage>> {
    let rows = sqlx::query(LIST_CONTACTS)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list contact messages")?;

    Ok(rows
        .iter()
        .map(|row| ContactMessage {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("phone"),
            message: row.get("message"),
            submitted_at: row.get("submitted_at"),
        })
        .collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn insert_contact_mysql(pool: &MySqlPool, message: &NewContactMessage) -> Result<i64> {
    let result = sqlx::query(INSERT_CONTACT)
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.phone)
        .bind(&message.message)
        .bind(message.submitted_at)
        .execute(pool)
        .await
        .context("Failed to store contact message")?;

    Ok(result.last_insert_id() as i64)
}

async fn list_contacts_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<ContactMessage>> {
    let rows = sqlx::query(LIST_CONTACTS)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list contact messages")?;

    Ok(rows
        .iter()
        .map(|row| ContactMessage {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("phone"),
            message: row.get("message"),
            submitted_at: row.get("submitted_at"),
        })
        .collect())
}
