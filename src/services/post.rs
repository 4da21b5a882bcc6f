//! Post service
//!
//! Business rules for blog posts:
//! - titles and bodies are required and bounded
//! - the slug is always derived from the title, on create and on every edit
//! - an uploaded image is stored first and its filename kept on the post
//! - the homepage shows a growing prefix of posts (see `pagination`)
//!
//! Every mutating call takes an [`AdminCapability`].

use crate::db::repositories::PostRepository;
use crate::models::{derive_slug, normalize_image_ref, NewPost, Post, PostUpdate, MAX_TITLE_LENGTH};
use crate::services::auth::AdminCapability;
use crate::services::image::{ImageError, ImageStore};
use crate::services::pagination::{paginate, PageWindow, PaginationError};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Post not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    BadRequest(#[from] PaginationError),

    #[error(transparent)]
    Image(#[from] ImageError),

    /// Database failure; not retried
    #[error("Storage error: {0}")]
    StorageError(#[from] anyhow::Error),
}

/// A file received with a post form
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Filename as sent by the client, before sanitising
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Title, body and image as submitted by the add and edit forms
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    /// Newly uploaded image, if any
    pub image: Option<UploadedImage>,
    /// Image reference carried over by the edit form when nothing was uploaded
    pub existing_image: Option<String>,
}

/// One homepage view: the posts to render and the continuation link
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub window: PageWindow,
    pub total: usize,
}

/// Post service
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    images: ImageStore,
    per_page: usize,
    max_content_length: usize,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        images: ImageStore,
        per_page: usize,
        max_content_length: usize,
    ) -> Self {
        Self {
            repo,
            images,
            per_page,
            max_content_length,
        }
    }

    /// Publish a new post.
    ///
    /// Duplicate titles (and so duplicate slugs) are accepted.
    pub async fn create(
        &self,
        _admin: &AdminCapability,
        draft: PostDraft,
    ) -> Result<Post, PostServiceError> {
        self.validate(&draft)?;

        let image_ref = match draft.image {
            Some(image) => Some(self.images.save(&image.filename, &image.bytes).await?),
            None => None,
        };

        let post = self
            .repo
            .create(&NewPost {
                slug: derive_slug(&draft.title),
                title: draft.title,
                content: draft.content,
                image_ref,
                published_at: Utc::now(),
            })
            .await
            .context("Failed to create post")?;

        tracing::info!(id = post.id, slug = %post.slug, "Post created");
        Ok(post)
    }

    /// First post (in publication order) with the given slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, PostServiceError> {
        Ok(self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post by slug")?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>, PostServiceError> {
        Ok(self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post by ID")?)
    }

    /// All posts in publication order, for the dashboard
    pub async fn list_all(&self, _admin: &AdminCapability) -> Result<Vec<Post>, PostServiceError> {
        let total = self.repo.count().await.context("Failed to count posts")?;

        Ok(self
            .repo
            .list(0, total)
            .await
            .context("Failed to list posts")?)
    }

    /// Replace title, slug, content, image and timestamp of an existing post.
    ///
    /// Without a new upload the carried-over image reference is kept (a blank
    /// one clears the image).
    pub async fn update(
        &self,
        _admin: &AdminCapability,
        id: i64,
        draft: PostDraft,
    ) -> Result<Post, PostServiceError> {
        self.validate(&draft)?;

        if self.get_by_id(id).await?.is_none() {
            return Err(PostServiceError::NotFound(id));
        }

        let image_ref = match draft.image {
            Some(image) => Some(self.images.save(&image.filename, &image.bytes).await?),
            None => normalize_image_ref(draft.existing_image),
        };

        let update = PostUpdate {
            slug: derive_slug(&draft.title),
            title: draft.title,
            content: draft.content,
            image_ref,
            published_at: Utc::now(),
        };

        let post = self
            .repo
            .update(id, &update)
            .await
            .context("Failed to update post")?
            .ok_or(PostServiceError::NotFound(id))?;

        tracing::info!(id, slug = %post.slug, "Post updated");
        Ok(post)
    }

    pub async fn delete(&self, _admin: &AdminCapability, id: i64) -> Result<(), PostServiceError> {
        let removed = self.repo.delete(id).await.context("Failed to delete post")?;
        if !removed {
            return Err(PostServiceError::NotFound(id));
        }

        tracing::info!(id, "Post deleted");
        Ok(())
    }

    /// Homepage view for the raw `load_more` query value
    pub async fn list_page(&self, load_more: Option<&str>) -> Result<PostPage, PostServiceError> {
        let count = self.repo.count().await.context("Failed to count posts")?;
        let total = usize::try_from(count).unwrap_or(0);

        let window = paginate(total, load_more, self.per_page)?;
        let limit = i64::try_from(window.size.min(total)).unwrap_or(i64::MAX);
        let posts = self
            .repo
            .list(0, limit)
            .await
            .context("Failed to list posts")?;

        Ok(PostPage {
            posts,
            window,
            total,
        })
    }

    fn validate(&self, draft: &PostDraft) -> Result<(), PostServiceError> {
        if draft.title.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if draft.title.chars().count() > MAX_TITLE_LENGTH {
            return Err(PostServiceError::ValidationError(format!(
                "Title cannot exceed {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        if draft.content.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Content cannot be empty".to_string(),
            ));
        }
        if draft.content.chars().count() > self.max_content_length {
            return Err(PostServiceError::ValidationError(format!(
                "Content cannot exceed {} characters",
                self.max_content_length
            )));
        }
        Ok(())
    }
}
