//! Database schema and migrations

use crate::{DbPool, Result, DbError};

pub const SCHEMA_VERSION: i32 = 1;

/// Run database migrations
pub fn migrate(pool: &DbPool) -> Result<()> {
    let conn = pool.get()?;

    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if current_version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "Catalog version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            "Migrating database from version {} to {}",
            current_version,
            SCHEMA_VERSION
        );

        if current_version < 1 {
            apply_v1(&conn)?;
        }

        conn.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
    }

    Ok(())
}

fn apply_v1(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Images: one row per filesystem path, never updated or deleted
        CREATE TABLE IF NOT EXISTS images (
            id INTEGER PRIMARY KEY NOT NULL,
            path TEXT NOT NULL UNIQUE
        );

        -- Tags: names may repeat, color is #RRGGBB text
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            color TEXT NOT NULL
        );

        -- Image-Tag mapping (many-to-many), no foreign keys
        CREATE TABLE IF NOT EXISTS image_tags (
            image_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (image_id, tag_id)
        );

        CREATE INDEX IF NOT EXISTS idx_image_tags_tag ON image_tags(tag_id);
        "#,
    )?;

    Ok(())
}
