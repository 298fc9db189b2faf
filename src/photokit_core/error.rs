use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotokitError {
    // Filesystem errors
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walker error: {0}")]
    Walkdir(#[from] walkdir::Error),

    // Metadata errors
    #[error("Metadata error for {path}: {reason}")]
    MetadataFailure { path: PathBuf, reason: String },

    #[error("No capture date found in {0}")]
    DateUnresolvable(PathBuf),

    // Image errors
    #[error("Failed to decode {path}: {reason}")]
    DecodeFailure { path: PathBuf, reason: String },

    #[error("JPEG encoding error: {0}")]
    Encode(#[from] image::ImageError),

    // Configuration errors
    #[error("JPEG quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),

    #[error("Tag profile error: {0}")]
    Profile(String),
}

impl PhotokitError {
    pub fn metadata(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PhotokitError::MetadataFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PhotokitError::DecodeFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for photokit operations.
pub type Result<T> = std::result::Result<T, PhotokitError>;
