//! Admin session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated admin session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (token stored in the `session` cookie)
    pub id: String,
    /// Username the session was opened for
    pub username: String,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
