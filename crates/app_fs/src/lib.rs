//! TagFiler File System Layer
//!
//! Provides:
//! - Directory browsing with the image extension allow-list
//! - Compressed tar archive creation

mod browser;
mod archive;

pub use browser::{FileEntry, ListOptions, list_directory, is_image_file, IMAGE_EXTENSIONS};
pub use archive::{ArchiveCodec, create_archive};

use thiserror::Error;

/// File system errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Archive error: {0}")]
    Archive(String),
}

impl FsError {
    /// Map an I/O error on `path` to the most specific variant
    pub fn from_io(e: std::io::Error, path: &std::path::Path) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => FsError::AccessDenied(path.display().to_string()),
            _ => FsError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
