//! Contact message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column bounds for contact messages, in characters
pub const MAX_NAME_LENGTH: usize = 25;
pub const MAX_EMAIL_LENGTH: usize = 50;
pub const MAX_PHONE_LENGTH: usize = 15;
pub const MAX_MESSAGE_LENGTH: usize = 255;

/// A message left through the contact form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    /// Unique identifier
    pub id: i64,
    /// Sender name
    pub name: String,
    /// Sender email address
    pub email: String,
    /// Sender phone number
    pub phone: String,
    /// Message body
    pub message: String,
    /// Submission timestamp
    pub submitted_at: DateTime<Utc>,
}

/// Record for inserting a new contact message
#[derive(Debug, Clone)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub submitted_at: DateTime<Utc>,
}
