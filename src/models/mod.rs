//! Data models
//!
//! This module contains the data structures persisted by the blog:
//! - `Post` and its insert/update records
//! - `ContactMessage` left through the contact form
//! - `Session` for the authenticated admin

mod contact;
mod post;
mod session;

pub use contact::{
    ContactMessage, NewContactMessage, MAX_EMAIL_LENGTH, MAX_MESSAGE_LENGTH, MAX_NAME_LENGTH,
    MAX_PHONE_LENGTH,
};
pub use post::{
    derive_slug, normalize_image_ref, NewPost, Post, PostUpdate, DEFAULT_MAX_CONTENT_LENGTH,
    MAX_TITLE_LENGTH,
};
pub use session::Session;
