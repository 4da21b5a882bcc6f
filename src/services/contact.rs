//! Contact form handling
//!
//! A submission is stored, then one notification is queued for the site
//! owner. Storage failures fail the request; notification problems never do.

use crate::db::repositories::ContactRepository;
use crate::models::{
    ContactMessage, NewContactMessage, MAX_EMAIL_LENGTH, MAX_MESSAGE_LENGTH, MAX_NAME_LENGTH,
    MAX_PHONE_LENGTH,
};
use crate::services::auth::AdminCapability;
use crate::services::notifier::{ContactNotification, NotificationQueue};
use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Messages shown on the admin dashboard
pub const INBOX_SIZE: i64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ContactServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] anyhow::Error),
}

/// Fields of the contact form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub message: String,
}

/// Latest contact messages with the total stored
#[derive(Debug, Clone, Serialize)]
pub struct ContactInbox {
    pub messages: Vec<ContactMessage>,
    pub total: i64,
}

pub struct ContactService {
    repo: Arc<dyn ContactRepository>,
    queue: NotificationQueue,
    site_name: String,
}

impl ContactService {
    pub fn new(
        repo: Arc<dyn ContactRepository>,
        queue: NotificationQueue,
        site_name: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            queue,
            site_name: site_name.into(),
        }
    }

    /// Store a contact message and notify the site owner
    pub async fn submit(&self, input: ContactInput) -> Result<ContactMessage, ContactServiceError> {
        let name = required("name", &input.name, MAX_NAME_LENGTH)?;
        let email = required("email", &input.email, MAX_EMAIL_LENGTH)?;
        let phone = required("phone", &input.phone, MAX_PHONE_LENGTH)?;
        let message = required("message", &input.message, MAX_MESSAGE_LENGTH)?;

        let stored = self
            .repo
            .create(&NewContactMessage {
                name,
                email,
                phone,
                message,
                submitted_at: Utc::now(),
            })
            .await
            .context("Failed to store contact message")?;

        tracing::info!(id = stored.id, "Contact message stored");

        self.queue.enqueue(ContactNotification {
            subject: format!(
                "New message from {} contact form {}",
                self.site_name, stored.name
            ),
            reply_to: stored.email.clone(),
            body: format!("{} \nphone: {}", stored.message, stored.phone),
        });

        Ok(stored)
    }

    /// Newest messages for the dashboard
    pub async fn inbox(&self, _admin: &AdminCapability) -> Result<ContactInbox, ContactServiceError> {
        let messages = self
            .repo
            .list(INBOX_SIZE)
            .await
            .context("Failed to list contact messages")?;
        let total = self
            .repo
            .count()
            .await
            .context("Failed to count contact messages")?;

        Ok(ContactInbox { messages, total })
    }
}

fn required(field: &str, value: &str, max: usize) -> Result<String, ContactServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ContactServiceError::ValidationError(format!(
            "{} is required",
            field
        )));
    }
    if value.chars().count() > max {
        return Err(ContactServiceError::ValidationError(format!(
            "{} cannot exceed {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}
