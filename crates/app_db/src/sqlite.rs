//! SQLite catalog operations

use crate::{DbError, DbPool, Result};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Image record in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub path: String,
}

/// Tag record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
    pub color: String,
}

/// Image-Tag mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTagRecord {
    pub image_id: i64,
    pub tag_id: i64,
}

/// Stored form of a path. Lossy conversion would let distinct paths share a row.
fn path_text(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| DbError::InvalidPath(path.to_string_lossy().into_owned()))
}

impl TagRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            color: row.get(2)?,
        })
    }
}

/// Catalog database operations.
///
/// Cheap to clone; all clones share the single pooled connection.
#[derive(Clone)]
pub struct CatalogDb {
    pool: DbPool,
}

impl CatalogDb {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    // ===== Image Operations =====

    /// Register an image path, returning its id. Existing paths keep their id.
    pub fn register_image(&self, path: &Path) -> Result<i64> {
        let path = path_text(path)?;
        let conn = self.conn()?;

        conn.execute(
            "INSERT OR IGNORE INTO images (path) VALUES (?1)",
            [path],
        )?;

        let id = conn.query_row(
            "SELECT id FROM images WHERE path = ?1",
            [path],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    /// Look up the id of a registered path
    pub fn image_id(&self, path: &Path) -> Result<Option<i64>> {
        let path = path_text(path)?;
        let conn = self.conn()?;

        let id = conn
            .query_row(
                "SELECT id FROM images WHERE path = ?1",
                [path],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id)
    }

    /// Get an image by id
    pub fn get_image(&self, image_id: i64) -> Result<Option<ImageRecord>> {
        let conn = self.conn()?;

        let record = conn
            .query_row(
                "SELECT id, path FROM images WHERE id = ?1",
                [image_id],
                |row| {
                    Ok(ImageRecord {
                        id: row.get(0)?,
                        path: row.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    /// Number of registered images
    pub fn count_images(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?)
    }

    // ===== Tag Operations =====

    /// Create a new tag. Callers validate name and color.
    pub fn create_tag(&self, name: &str, color: &str) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO tags (name, color) VALUES (?1, ?2)",
            params![name, color],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get all tags
    pub fn list_tags(&self) -> Result<Vec<TagRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare("SELECT id, name, color FROM tags ORDER BY id")?;
        let tags = stmt
            .query_map([], TagRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tags)
    }

    /// Number of tags
    pub fn count_tags(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?)
    }

    /// Get a tag by id
    pub fn get_tag(&self, tag_id: i64) -> Result<Option<TagRecord>> {
        let conn = self.conn()?;

        let tag = conn
            .query_row(
                "SELECT id, name, color FROM tags WHERE id = ?1",
                [tag_id],
                TagRecord::from_row,
            )
            .optional()?;

        Ok(tag)
    }

    // ===== Association Operations =====

    /// Tags attached to an image
    pub fn tags_for_image(&self, image_id: i64) -> Result<Vec<TagRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, t.color
             FROM image_tags it
             INNER JOIN tags t ON it.tag_id = t.id
             WHERE it.image_id = ?1",
        )?;
        let tags = stmt
            .query_map([image_id], TagRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tags)
    }

    /// Tags not yet attached to an image
    pub fn tags_not_applied(&self, image_id: i64) -> Result<Vec<TagRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, name, color FROM tags
             WHERE id NOT IN (SELECT tag_id FROM image_tags WHERE image_id = ?1)",
        )?;
        let tags = stmt
            .query_map([image_id], TagRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tags)
    }

    /// Attach a tag to an image. Returns false if the pair already existed.
    pub fn attach_tag(&self, image_id: i64, tag_id: i64) -> Result<bool> {
        let conn = self.conn()?;

        let rows = conn.execute(
            "INSERT OR IGNORE INTO image_tags (image_id, tag_id) VALUES (?1, ?2)",
            [image_id, tag_id],
        )?;

        Ok(rows > 0)
    }

    /// Detach a tag from an image. Returns false if the pair was absent.
    pub fn detach_tag(&self, image_id: i64, tag_id: i64) -> Result<bool> {
        let conn = self.conn()?;

        let rows = conn.execute(
            "DELETE FROM image_tags WHERE image_id = ?1 AND tag_id = ?2",
            [image_id, tag_id],
        )?;

        Ok(rows > 0)
    }

    /// Every association row
    pub fn list_associations(&self) -> Result<Vec<ImageTagRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare("SELECT image_id, tag_id FROM image_tags")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ImageTagRecord {
                    image_id: row.get(0)?,
                    tag_id: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Distinct paths of images carrying a tag with exactly this name
    pub fn search_images_by_tag(&self, tag_name: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT DISTINCT i.path
             FROM images i
             INNER JOIN image_tags it ON i.id = it.image_id
             INNER JOIN tags t ON it.tag_id = t.id
             WHERE t.name = ?1
             ORDER BY i.path",
        )?;
        let paths = stmt
            .query_map([tag_name], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(paths)
    }
}
