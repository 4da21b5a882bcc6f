//! Theme engine error types

use std::path::PathBuf;
use thiserror::Error;

/// Theme-specific errors
#[derive(Debug, Error)]
pub enum ThemeError {
    /// Configured override directory does not exist
    #[error("Theme directory not found: {0}")]
    NotFound(PathBuf),

    /// Template parsing or rendering error
    #[error("Template error: {0}")]
    TemplateError(String),
}
