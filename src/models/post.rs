//! Post model
//!
//! This module provides:
//! - `Post` entity representing a published blog post
//! - `NewPost` / `PostUpdate` records handed to the repository
//! - `derive_slug`, the only way a slug is ever produced

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum title length, in characters
pub const MAX_TITLE_LENGTH: usize = 50;

/// Default maximum content length, in characters
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 255;

/// Post entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Post title
    pub title: String,
    /// URL slug derived from the title
    pub slug: String,
    /// Post body
    pub content: String,
    /// Filename of the associated image under the upload directory
    pub image_ref: Option<String>,
    /// Publication timestamp (refreshed on every edit)
    pub published_at: DateTime<Utc>,
}

/// Record for inserting a new post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub image_ref: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// Full replacement of an existing post's fields
#[derive(Debug, Clone)]
pub struct PostUpdate {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub image_ref: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// Derive a slug from a title: lowercase, every space replaced by a hyphen.
///
/// Nothing else is touched, so `"Hello  World!"` becomes `"hello--world!"`.
pub fn derive_slug(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}

/// Normalize an optional image reference, treating blank values as absent.
pub fn normalize_image_ref(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
