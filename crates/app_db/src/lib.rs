//! TagFiler Database Layer
//!
//! SQLite catalog of images, tags and their associations, reached through a
//! single serialized connection.

mod sqlite;
mod schema;
mod pool;

pub use sqlite::{CatalogDb, ImageRecord, TagRecord, ImageTagRecord};
pub use pool::{DbPool, init_pool, init_memory_pool};
pub use schema::{migrate, SCHEMA_VERSION};

use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Path is not valid UTF-8: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<r2d2::Error> for DbError {
    fn from(e: r2d2::Error) -> Self {
        DbError::Pool(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Get the database directory
pub fn db_dir() -> PathBuf {
    ProjectDirs::from("com", "TagFiler", "TagFiler")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Default location of the catalog file
pub fn default_db_path() -> PathBuf {
    db_dir().join("index.db")
}

/// Open the catalog at `path`, creating and migrating it if needed
pub fn init(path: &Path) -> Result<CatalogDb> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = init_pool(path)?;
    migrate(&pool)?;

    tracing::info!("Database initialized at {:?}", path);
    Ok(CatalogDb::new(pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("index.db");

        let db = init(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.count_tags().unwrap(), 0);
    }

    #[test]
    fn test_init_reopens_existing_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index.db");

        {
            let db = init(&path).unwrap();
            db.create_tag("sunset", "#FF8800").unwrap();
        }

        let db = init(&path).unwrap();
        assert_eq!(db.count_tags().unwrap(), 1);
    }
}
