//! Uploaded post images
//!
//! Images are written under `upload.path` using a sanitised version of the
//! client-supplied filename, and served back at `/uploads/<name>`.

use std::path::PathBuf;
use tokio::fs;

/// URL prefix under which stored images are served
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Error types for image storage
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Invalid file name: {0:?}")]
    InvalidFilename(String),

    #[error("File too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Failed to save image: {0}")]
    Io(#[from] std::io::Error),
}

/// Reduce a client-supplied filename to a safe, flat name.
///
/// Path separators and whitespace runs become `_`, every character outside
/// `[A-Za-z0-9._-]` is dropped, and leading or trailing `.`/`_` are stripped.
/// Returns `None` when nothing usable remains.
pub fn secure_filename(name: &str) -> Option<String> {
    let spaced = name.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Writes uploaded images into a directory
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    max_file_size: u64,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            dir: dir.into(),
            max_file_size,
        }
    }

    /// Store `bytes` under the sanitised form of `original_name`.
    ///
    /// An existing file with the same name is overwritten. Returns the stored
    /// filename, which is what posts keep as their image reference.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, ImageError> {
        let filename = secure_filename(original_name)
            .ok_or_else(|| ImageError::InvalidFilename(original_name.to_string()))?;

        let size = bytes.len() as u64;
        if size > self.max_file_size {
            return Err(ImageError::TooLarge {
                size,
                max: self.max_file_size,
            });
        }

        fs::create_dir_all(&self.dir).await?;
        fs::write(self.dir.join(&filename), bytes).await?;

        tracing::info!(file = %filename, size, "Stored uploaded image");
        Ok(filename)
    }
}
