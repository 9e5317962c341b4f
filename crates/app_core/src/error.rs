//! Application error types

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Recoverable Errors (notify user, continue) =====
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    // ===== Fatal Errors (application termination) =====
    #[error("Database corruption: {0}")]
    DbCorruption(String),

    #[error("System resource exhaustion: {0}")]
    SystemResource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Init(String),
}

impl AppError {
    /// Is this error recoverable?
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Io(_)
                | AppError::FileNotFound(_)
                | AppError::AccessDenied(_)
                | AppError::NotADirectory(_)
                | AppError::ImageDecode(_)
                | AppError::Archive(_)
                | AppError::Store(_)
                | AppError::Validation(_)
        )
    }

    /// Is this a fatal error?
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AppError::FileNotFound(path) => format!("File not found: {}", path),
            AppError::AccessDenied(path) => format!("Access denied: {}", path),
            AppError::NotADirectory(path) => format!("Not a folder: {}", path),
            AppError::ImageDecode(msg) => format!("Cannot load image: {}", msg),
            AppError::Validation(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl From<app_fs::FsError> for AppError {
    fn from(e: app_fs::FsError) -> Self {
        match e {
            app_fs::FsError::NotFound(p) => AppError::FileNotFound(p),
            app_fs::FsError::AccessDenied(p) => AppError::AccessDenied(p),
            app_fs::FsError::InvalidPath(p) => AppError::NotADirectory(p),
            app_fs::FsError::Archive(msg) => AppError::Archive(msg),
            app_fs::FsError::Io(e) => AppError::Io(e),
        }
    }
}

impl From<app_db::DbError> for AppError {
    fn from(e: app_db::DbError) -> Self {
        match e {
            app_db::DbError::Migration(msg) => AppError::DbCorruption(msg),
            app_db::DbError::InvalidPath(p) => AppError::Validation(format!("Path is not valid UTF-8: {}", p)),
            _ => AppError::Store(e.to_string()),
        }
    }
}

impl From<image::ImageError> for AppError {
    fn from(e: image::ImageError) -> Self {
        AppError::ImageDecode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_are_recoverable() {
        let err: AppError = app_db::DbError::Pool("timed out".into()).into();
        assert!(matches!(err, AppError::Store(_)));
        assert!(err.is_recoverable());

        let err: AppError = app_db::DbError::Migration("too new".into()).into();
        assert!(err.is_fatal());

        let err: AppError = app_db::DbError::InvalidPath("/pics/\u{FFFD}.png".into()).into();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_fs_errors_map_to_user_messages() {
        let err: AppError = app_fs::FsError::NotFound("/pics".into()).into();
        assert_eq!(err.user_message(), "File not found: /pics");

        let err = AppError::Validation("Tag name cannot be empty".into());
        assert_eq!(err.user_message(), "Tag name cannot be empty");
    }
}
