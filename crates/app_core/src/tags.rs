//! Tag association manager
//!
//! Validates user input before it reaches the catalog. Every operation is a
//! single statement against the shared connection; nothing is batched.

use crate::AppError;
use app_db::{CatalogDb, TagRecord};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Display color of a tag, stored as `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TagColor {
    pub const WHITE: TagColor = TagColor { r: 0xFF, g: 0xFF, b: 0xFF };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for TagColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for TagColor {
    type Err = AppError;

    /// Accepts `#RRGGBB` or `RRGGBB`, any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::Validation(format!("Invalid hex color: {}", s)));
        }

        let rgb = u32::from_str_radix(hex, 16)
            .map_err(|_| AppError::Validation(format!("Invalid hex color: {}", s)))?;

        Ok(Self {
            r: (rgb >> 16) as u8,
            g: (rgb >> 8 & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
        })
    }
}

impl fmt::Display for TagColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Queries and mutations of the image/tag relation
#[derive(Clone)]
pub struct TagManager {
    catalog: CatalogDb,
}

impl TagManager {
    pub fn new(catalog: CatalogDb) -> Self {
        Self { catalog }
    }

    /// Create a tag. An empty name or malformed color is rejected before any insert.
    pub fn create_tag(&self, name: &str, color: &str) -> Result<TagRecord, AppError> {
        if name.is_empty() {
            return Err(AppError::Validation("Tag name cannot be empty".into()));
        }
        let color = color.parse::<TagColor>()?.to_string();

        let id = self.catalog.create_tag(name, &color)?;
        tracing::info!(tag_id = id, name, color = %color, "Tag created");

        Ok(TagRecord {
            id,
            name: name.to_string(),
            color,
        })
    }

    /// Tags attached to an image, in no particular order
    pub fn tags_for_image(&self, image_id: i64) -> Result<Vec<TagRecord>, AppError> {
        Ok(self.catalog.tags_for_image(image_id)?)
    }

    /// Tags that could still be attached to an image
    pub fn tags_not_applied(&self, image_id: i64) -> Result<Vec<TagRecord>, AppError> {
        Ok(self.catalog.tags_not_applied(image_id)?)
    }

    /// Attach a tag; attaching an existing pair changes nothing
    pub fn attach_tag(&self, image_id: i64, tag_id: i64) -> Result<(), AppError> {
        let inserted = self.catalog.attach_tag(image_id, tag_id)?;
        tracing::debug!(image_id, tag_id, inserted, "Attach tag");
        Ok(())
    }

    /// Detach a tag; detaching a missing pair changes nothing
    pub fn detach_tag(&self, image_id: i64, tag_id: i64) -> Result<(), AppError> {
        let removed = self.catalog.detach_tag(image_id, tag_id)?;
        tracing::debug!(image_id, tag_id, removed, "Detach tag");
        Ok(())
    }

    pub fn list_tags(&self) -> Result<Vec<TagRecord>, AppError> {
        Ok(self.catalog.list_tags()?)
    }

    pub fn count_tags(&self) -> Result<i64, AppError> {
        Ok(self.catalog.count_tags()?)
    }

    /// Paths of images carrying a tag named exactly `tag_name`
    pub fn search_images_by_tag(&self, tag_name: &str) -> Result<Vec<String>, AppError> {
        Ok(self.catalog.search_images_by_tag(tag_name)?)
    }

    /// Id of `path`, registering it first if needed
    pub fn register_image(&self, path: &Path) -> Result<i64, AppError> {
        Ok(self.catalog.register_image(path)?)
    }

    /// Id of an already registered path
    pub fn image_id(&self, path: &Path) -> Result<Option<i64>, AppError> {
        Ok(self.catalog.image_id(path)?)
    }
}
