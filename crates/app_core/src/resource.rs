//! Loaded file resources and the path-keyed resource cache

use crate::AppError;
use dashmap::DashMap;
use image::ImageReader;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

const PLACEHOLDER_NAME: &str = "placeholder";

/// Raw file content kept in memory for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    name: String,
    bytes: Vec<u8>,
    hash: u64,
}

impl Resource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let hash = xxh3_64(&bytes);
        Self {
            name: name.into(),
            bytes,
            hash,
        }
    }

    /// Empty stand-in shown when a file cannot be loaded
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_NAME, Vec::new())
    }

    pub fn is_placeholder(&self) -> bool {
        self.name == PLACEHOLDER_NAME && self.bytes.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// xxh3 hash of the content
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Probe the image header for its dimensions without decoding pixels
    pub fn dimensions(&self) -> Result<(u32, u32), AppError> {
        let reader = ImageReader::new(Cursor::new(&self.bytes))
            .with_guessed_format()
            .map_err(|e| AppError::ImageDecode(e.to_string()))?;

        Ok(reader.into_dimensions()?)
    }
}

/// Path-keyed store of loaded resources.
///
/// Implementations must tolerate concurrent `get`/`insert` from scan units.
pub trait ResourceCache: Send + Sync {
    fn get(&self, path: &Path) -> Option<Arc<Resource>>;

    fn insert(&self, path: PathBuf, resource: Arc<Resource>);

    fn len(&self) -> usize;

    /// Total bytes held
    fn memory_usage(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded, process-lifetime cache. Entries are never evicted or invalidated.
#[derive(Default)]
pub struct MemoryResourceCache {
    entries: DashMap<PathBuf, Arc<Resource>>,
}

impl MemoryResourceCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResourceCache for MemoryResourceCache {
    fn get(&self, path: &Path) -> Option<Arc<Resource>> {
        self.entries.get(path).map(|e| e.value().clone())
    }

    fn insert(&self, path: PathBuf, resource: Arc<Resource>) {
        self.entries.insert(path, resource);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn memory_usage(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }
}

/// Reads a file into a resource. Called from blocking worker threads.
pub trait ResourceLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Resource, AppError>;
}

/// Loader reading the whole file from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl ResourceLoader for FsLoader {
    fn load(&self, path: &Path) -> Result<Resource, AppError> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::FileNotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => AppError::AccessDenied(path.display().to_string()),
            _ => AppError::Io(e),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Resource::new(name, bytes))
    }
}

/// Where a resource came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Cache,
    Disk,
}

/// Return the cached resource for `path`, loading and storing it on a miss.
///
/// Concurrent misses for one path may both load; the later insert wins.
/// Failed loads are not cached.
pub fn get_or_load(
    cache: &dyn ResourceCache,
    loader: &dyn ResourceLoader,
    path: &Path,
) -> Result<(Arc<Resource>, LoadSource), AppError> {
    if let Some(resource) = cache.get(path) {
        return Ok((resource, LoadSource::Cache));
    }

    let resource = Arc::new(loader.load(path)?);
    cache.insert(path.to_path_buf(), resource.clone());
    Ok((resource, LoadSource::Disk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingLoader {
        calls: AtomicUsize,
    }

    impl ResourceLoader for CountingLoader {
        fn load(&self, path: &Path) -> Result<Resource, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            FsLoader.load(path)
        }
    }

    #[test]
    fn test_placeholder() {
        let placeholder = Resource::placeholder();
        assert!(placeholder.is_placeholder());
        assert!(placeholder.is_empty());
        assert!(!Resource::new("a.png", vec![1]).is_placeholder());
    }

    #[test]
    fn test_first_lookup_wins() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.png");
        std::fs::write(&path, b"first").unwrap();

        let cache = MemoryResourceCache::new();
        let loader = CountingLoader { calls: AtomicUsize::new(0) };

        let (first, source) = get_or_load(&cache, &loader, &path).unwrap();
        assert_eq!(source, LoadSource::Disk);
        assert_eq!(first.bytes(), b"first");
        assert_eq!(first.name(), "a.png");

        // Content changes on disk are not observed
        std::fs::write(&path, b"second").unwrap();
        let (again, source) = get_or_load(&cache, &loader, &path).unwrap();
        assert_eq!(source, LoadSource::Cache);
        assert_eq!(again.bytes(), b"first");

        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.memory_usage(), 5);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.png");
        let cache = MemoryResourceCache::new();

        let result = get_or_load(&cache, &FsLoader, &path);
        assert!(matches!(result, Err(AppError::FileNotFound(_))));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_dimensions_of_png() {
        let mut bytes = Vec::new();
        image::RgbaImage::new(3, 2)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let resource = Resource::new("tiny.png", bytes);
        assert_eq!(resource.dimensions().unwrap(), (3, 2));
        assert!(Resource::new("junk.png", b"not an image".to_vec()).dimensions().is_err());
    }
}
