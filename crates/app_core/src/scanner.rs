//! Directory scanner and bounded loader
//!
//! A scan lists one directory (non-recursive), and for every recognized image
//! runs a unit that registers the path in the catalog and loads the file
//! through the resource cache. Units wait on a counting semaphore, so at most
//! `concurrency` of them touch the disk at once. Catalog access is further
//! serialized by the single pooled connection.

use crate::events::{EventSender, ScanEvent, ScanSummary};
use crate::resource::{
    get_or_load, FsLoader, LoadSource, MemoryResourceCache, Resource, ResourceCache, ResourceLoader,
};
use crate::AppError;
use app_db::CatalogDb;
use app_fs::{list_directory, ListOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, Span};

/// What a finished unit reports back to the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitOutcome {
    Loaded(LoadSource),
    Failed,
}

/// Scans directories and materializes image bytes into the resource cache
#[derive(Clone)]
pub struct Scanner {
    catalog: CatalogDb,
    cache: Arc<dyn ResourceCache>,
    loader: Arc<dyn ResourceLoader>,
    concurrency: usize,
    excluded_dirs: Arc<Vec<PathBuf>>,
}

impl Scanner {
    pub fn new(
        catalog: CatalogDb,
        cache: Arc<dyn ResourceCache>,
        loader: Arc<dyn ResourceLoader>,
        concurrency: usize,
    ) -> Self {
        Self {
            catalog,
            cache,
            loader,
            concurrency: concurrency.max(1),
            excluded_dirs: Arc::new(Vec::new()),
        }
    }

    /// Disk loader with a fresh unbounded cache
    pub fn with_defaults(catalog: CatalogDb, concurrency: usize) -> Self {
        Self::new(
            catalog,
            Arc::new(MemoryResourceCache::new()),
            Arc::new(FsLoader),
            concurrency,
        )
    }

    /// Directories that `scan` refuses to touch, along with everything below them
    pub fn with_excluded_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.excluded_dirs = Arc::new(dirs.into_iter().map(|d| canonical(&d)).collect());
        self
    }

    /// Whether `dir` is an excluded directory or lies inside one
    pub fn is_excluded(&self, dir: &Path) -> bool {
        let dir = canonical(dir);
        self.excluded_dirs.iter().any(|excluded| dir.starts_with(excluded))
    }

    /// Gate capacity
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn cache(&self) -> &Arc<dyn ResourceCache> {
        &self.cache
    }

    /// Image files directly inside `dir`
    pub fn find_images(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
        let entries = list_directory(dir, &ListOptions::images_only())?;
        Ok(entries
            .into_iter()
            .filter(|e| e.is_image())
            .map(|e| e.path)
            .collect())
    }

    /// Scan `dir`, sending one event per unit and a final `ScanCompleted`.
    ///
    /// Fails without launching anything if the directory cannot be listed.
    /// Individual load failures never fail the batch.
    #[tracing::instrument(skip(self, dir, events), fields(dir = %dir.display()))]
    pub async fn scan(&self, dir: &Path, events: &EventSender) -> Result<ScanSummary, AppError> {
        if self.is_excluded(dir) {
            tracing::info!("Directory is excluded from scanning");
            let summary = ScanSummary {
                dir: dir.to_path_buf(),
                excluded: true,
                ..Default::default()
            };
            send(events, ScanEvent::ScanCompleted(summary.clone()));
            return Ok(summary);
        }

        let images = Self::find_images(dir)?;

        let mut summary = ScanSummary {
            dir: dir.to_path_buf(),
            launched: images.len(),
            ..Default::default()
        };
        tracing::info!(
            images = images.len(),
            concurrency = self.concurrency,
            "Scanning directory"
        );

        let gate = Arc::new(Semaphore::new(self.concurrency));
        let mut units = JoinSet::new();

        for path in images {
            let unit = self
                .clone()
                .run_gated(gate.clone(), path, events.clone(), Span::current());
            units.spawn(unit.in_current_span());
        }

        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(Ok(UnitOutcome::Loaded(source))) => {
                    summary.loaded += 1;
                    if source == LoadSource::Cache {
                        summary.cached += 1;
                    }
                }
                Ok(Ok(UnitOutcome::Failed)) => summary.failed += 1,
                Ok(Err(e)) => {
                    tracing::error!("Scan unit aborted: {}", e);
                    summary.failed += 1;
                }
                Err(e) => {
                    tracing::error!("Scan unit task failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            loaded = summary.loaded,
            failed = summary.failed,
            cached = summary.cached,
            "Scan completed"
        );
        send(events, ScanEvent::ScanCompleted(summary.clone()));

        Ok(summary)
    }

    /// Wait for a gate slot, then run the unit on the blocking pool
    async fn run_gated(
        self,
        gate: Arc<Semaphore>,
        path: PathBuf,
        events: EventSender,
        span: Span,
    ) -> Result<UnitOutcome, AppError> {
        let _permit = gate
            .acquire_owned()
            .await
            .map_err(|e| AppError::SystemResource(e.to_string()))?;

        // Permit is held until the blocking read returns
        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            self.run_unit(&path, &events)
        })
        .await
        .map_err(|e| AppError::SystemResource(format!("Scan unit failed: {}", e)))
    }

    /// Register and load a single image. Runs on a blocking worker thread.
    fn run_unit(&self, path: &Path, events: &EventSender) -> UnitOutcome {
        let image_id = match self.catalog.register_image(path) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!("Failed to register image {}: {}", path.display(), e);
                None
            }
        };

        match get_or_load(self.cache.as_ref(), self.loader.as_ref(), path) {
            Ok((resource, source)) => {
                tracing::debug!(
                    path = %path.display(),
                    bytes = resource.len(),
                    ?source,
                    "Image loaded"
                );
                send(
                    events,
                    ScanEvent::ImageLoaded {
                        path: path.to_path_buf(),
                        image_id,
                        resource,
                    },
                );
                UnitOutcome::Loaded(source)
            }
            Err(e) => {
                tracing::error!("Error loading image {}: {}", path.display(), e);
                send(
                    events,
                    ScanEvent::LoadFailed {
                        path: path.to_path_buf(),
                        image_id,
                        error: e.user_message(),
                        placeholder: Arc::new(Resource::placeholder()),
                    },
                );
                UnitOutcome::Failed
            }
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn send(events: &EventSender, event: ScanEvent) {
    if events.send(event).is_err() {
        tracing::debug!("Event queue closed, dropping scan event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventQueue;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn catalog() -> CatalogDb {
        let pool = app_db::init_memory_pool().unwrap();
        app_db::migrate(&pool).unwrap();
        CatalogDb::new(pool)
    }

    /// Disk loader that fails for the listed file names
    struct FailingLoader {
        fail: HashSet<String>,
    }

    impl ResourceLoader for FailingLoader {
        fn load(&self, path: &Path) -> Result<Resource, AppError> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            if self.fail.contains(&name) {
                return Err(AppError::AccessDenied(path.display().to_string()));
            }
            FsLoader.load(path)
        }
    }

    /// Tracks how many loads run at once
    #[derive(Default)]
    struct GaugeLoader {
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl ResourceLoader for GaugeLoader {
        fn load(&self, path: &Path) -> Result<Resource, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(25));
            let result = FsLoader.load(path);
            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    #[tokio::test]
    async fn test_pics_scenario_completes_despite_failure() {
        let temp_dir = TempDir::new().unwrap();
        let pics = temp_dir.path();
        std::fs::write(pics.join("a.png"), b"png").unwrap();
        std::fs::write(pics.join("b.txt"), b"text").unwrap();
        std::fs::write(pics.join("c.jpg"), b"jpg").unwrap();

        let db = catalog();
        let loader = FailingLoader {
            fail: HashSet::from(["c.jpg".to_string()]),
        };
        let scanner = Scanner::new(
            db.clone(),
            Arc::new(MemoryResourceCache::new()),
            Arc::new(loader),
            4,
        );

        let (tx, queue) = EventQueue::channel();
        let summary = scanner.scan(pics, &tx).await.unwrap();

        assert_eq!(summary.launched, 2);
        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(db.count_images().unwrap(), 2);

        let events = queue.drain();
        assert_eq!(events.len(), 3);
        assert!(matches!(events.last(), Some(ScanEvent::ScanCompleted(s)) if *s == summary));

        let mut loaded = Vec::new();
        let mut failed = Vec::new();
        for event in &events[..2] {
            match event {
                ScanEvent::ImageLoaded { path, image_id, resource } => {
                    assert!(image_id.is_some());
                    assert_eq!(resource.bytes(), b"png");
                    loaded.push(path.file_name().unwrap().to_string_lossy().to_string());
                }
                ScanEvent::LoadFailed { path, placeholder, .. } => {
                    assert!(placeholder.is_placeholder());
                    failed.push(path.file_name().unwrap().to_string_lossy().to_string());
                }
                ScanEvent::ScanCompleted(_) => panic!("completion before units finished"),
            }
        }
        assert_eq!(loaded, vec!["a.png"]);
        assert_eq!(failed, vec!["c.jpg"]);
        assert_eq!(scanner.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_counts_units_and_rescans_from_cache() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        for name in ["1.jpg", "2.JPEG", "3.png", "4.gif", "5.bmp", "6.ico"] {
            std::fs::write(dir.join(name), name.as_bytes()).unwrap();
        }
        for name in ["notes.txt", "photo.webp", "README"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.join("nested.png")).unwrap();

        let db = catalog();
        let loader = Arc::new(GaugeLoader::default());
        let scanner = Scanner::new(
            db.clone(),
            Arc::new(MemoryResourceCache::new()),
            loader.clone(),
            2,
        );

        let (tx, _queue) = EventQueue::channel();
        let first = scanner.scan(dir, &tx).await.unwrap();
        assert_eq!(first.launched, 6);
        assert_eq!(first.loaded, 6);
        assert_eq!(first.cached, 0);
        assert_eq!(db.count_images().unwrap(), 6);

        let second = scanner.scan(dir, &tx).await.unwrap();
        assert_eq!(second.launched, 6);
        assert_eq!(second.cached, 6);
        assert_eq!(db.count_images().unwrap(), 6);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_gate_caps_concurrent_reads() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..12 {
            std::fs::write(temp_dir.path().join(format!("img{}.png", i)), b"px").unwrap();
        }

        let loader = Arc::new(GaugeLoader::default());
        let scanner = Scanner::new(
            catalog(),
            Arc::new(MemoryResourceCache::new()),
            loader.clone(),
            3,
        );

        let (tx, _queue) = EventQueue::channel();
        let summary = scanner.scan(temp_dir.path(), &tx).await.unwrap();

        assert_eq!(summary.loaded, 12);
        let peak = loader.peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 3, "peak concurrency was {}", peak);
        assert_eq!(loader.active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_directory_completes_immediately() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = Scanner::with_defaults(catalog(), 2);

        let (tx, queue) = EventQueue::channel();
        let summary = scanner.scan(temp_dir.path(), &tx).await.unwrap();

        assert_eq!(summary.launched, 0);
        let events = queue.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ScanEvent::ScanCompleted(s) if s.launched == 0));
    }

    #[tokio::test]
    async fn test_unreadable_directory_launches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let db = catalog();
        let scanner = Scanner::with_defaults(db.clone(), 2);

        let (tx, queue) = EventQueue::channel();
        let result = scanner.scan(&temp_dir.path().join("missing"), &tx).await;

        assert!(matches!(result, Err(AppError::FileNotFound(_))));
        assert!(queue.drain().is_empty());
        assert_eq!(db.count_images().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scan_survives_closed_queue() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.png"), b"png").unwrap();
        let scanner = Scanner::with_defaults(catalog(), 1);

        let (tx, queue) = EventQueue::channel();
        drop(queue);

        let summary = scanner.scan(temp_dir.path(), &tx).await.unwrap();
        assert_eq!(summary.loaded, 1);
    }

    #[tokio::test]
    async fn test_excluded_directory_launches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let private = temp_dir.path().join("private");
        let nested = private.join("2024");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(private.join("a.png"), b"png").unwrap();
        std::fs::write(nested.join("b.jpg"), b"jpg").unwrap();
        std::fs::write(temp_dir.path().join("c.gif"), b"gif").unwrap();

        let db = catalog();
        let loader = Arc::new(GaugeLoader::default());
        let scanner = Scanner::new(
            db.clone(),
            Arc::new(MemoryResourceCache::new()),
            loader.clone(),
            2,
        )
        .with_excluded_dirs([private.clone()]);

        let (tx, queue) = EventQueue::channel();
        for dir in [&private, &nested] {
            let summary = scanner.scan(dir, &tx).await.unwrap();
            assert!(summary.excluded);
            assert_eq!(summary.launched, 0);
        }

        let events = queue.drain();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, ScanEvent::ScanCompleted(s) if s.excluded)));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
        assert_eq!(db.count_images().unwrap(), 0);

        // The parent is not excluded
        let summary = scanner.scan(temp_dir.path(), &tx).await.unwrap();
        assert!(!summary.excluded);
        assert_eq!(summary.launched, 1);
        assert_eq!(db.count_images().unwrap(), 1);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let scanner = Scanner::with_defaults(catalog(), 0);
        assert_eq!(scanner.concurrency(), 1);
    }
}
