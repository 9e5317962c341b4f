//! Directory listing for the scan pipeline

use crate::{FsError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions recognized as images by the scanner (lowercase, no dot)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "ico"];

/// One direct child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    /// Lowercased, empty when absent
    pub extension: String,
}

impl FileEntry {
    fn from_dir_entry(entry: &fs::DirEntry) -> Result<Self> {
        let path = entry.path();
        // Follows symlinks so a link to an image counts as an image
        let metadata = fs::metadata(&path).map_err(|e| FsError::from_io(e, &path))?;

        Ok(Self {
            name: entry.file_name().to_string_lossy().into_owned(),
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
            is_dir: metadata.is_dir(),
            size: metadata.len(),
            path,
        })
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    pub fn is_image(&self) -> bool {
        !self.is_dir && IMAGE_EXTENSIONS.contains(&self.extension.as_str())
    }
}

/// Which entries `list_directory` keeps
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    pub include_hidden: bool,
    pub include_dirs: bool,
    pub images_only: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            include_hidden: false,
            include_dirs: true,
            images_only: false,
        }
    }
}

impl ListOptions {
    /// Image files only, hidden files included
    pub fn images_only() -> Self {
        Self {
            include_hidden: true,
            include_dirs: false,
            images_only: true,
        }
    }

    fn keeps(&self, entry: &FileEntry) -> bool {
        if entry.is_hidden() && !self.include_hidden {
            return false;
        }
        if entry.is_dir {
            return self.include_dirs;
        }
        !self.images_only || entry.is_image()
    }
}

/// Direct children of `dir` (no recursion): directories first, then by name ignoring case
pub fn list_directory<P: AsRef<Path>>(dir: P, options: &ListOptions) -> Result<Vec<FileEntry>> {
    let dir = dir.as_ref();

    let metadata = fs::metadata(dir).map_err(|e| FsError::from_io(e, dir))?;
    if !metadata.is_dir() {
        return Err(FsError::InvalidPath(format!("Not a directory: {}", dir.display())));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| FsError::from_io(e, dir))? {
        let entry = entry?;
        match FileEntry::from_dir_entry(&entry) {
            Ok(file) if options.keeps(&file) => entries.push(file),
            Ok(_) => {}
            // Dangling symlinks and races with deletion
            Err(e) => tracing::debug!("Skipping {:?}: {}", entry.path(), e),
        }
    }

    entries.sort_by_cached_key(|e| (!e.is_dir, e.name.to_lowercase()));
    Ok(entries)
}

/// Whether `path` has a recognized image extension (case-insensitive)
pub fn is_image_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}
