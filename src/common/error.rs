//! Crate-wide error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not process image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Integrity violation on a record, shown to the user as-is
    #[error("{0}")]
    Validation(String),

    #[error("Unsupported file type")]
    UnsupportedFileType,

    #[error("Image must be at least {width} pixels wide or {height} pixels tall")]
    ImageTooSmall { width: u32, height: u32 },

    #[error("Mail delivery failed: {0}")]
    Mail(String),
}

pub type Result<T> = std::result::Result<T, CmsError>;
