//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They enforce
//! validation, the admin gate and the pagination rules.

pub mod auth;
pub mod contact;
pub mod image;
pub mod notifier;
pub mod pagination;
pub mod password;
pub mod post;

pub use auth::{AdminCapability, AuthError, AuthService};
pub use contact::{ContactInbox, ContactInput, ContactService, ContactServiceError};
pub use image::{secure_filename, ImageError, ImageStore};
pub use notifier::{
    notifier_from_config, ContactNotification, LogNotifier, NotificationQueue, Notifier,
    SmtpNotifier,
};
pub use pagination::{paginate, PageWindow, PaginationError};
pub use password::{hash_password, verify_password};
pub use post::{PostDraft, PostPage, PostService, PostServiceError, UploadedImage};
