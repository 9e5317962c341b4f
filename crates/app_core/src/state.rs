//! Application state management

use crate::{AppConfig, AppError, Scanner, TagManager};
use app_db::CatalogDb;
use parking_lot::RwLock;
use std::path::Path;

/// Everything a front end needs for one session
pub struct AppState {
    /// Application configuration
    pub config: RwLock<AppConfig>,

    /// Catalog of images, tags and associations
    pub catalog: CatalogDb,

    /// Tag association manager
    pub tags: TagManager,

    /// Directory scanner with its resource cache
    pub scanner: Scanner,
}

impl AppState {
    /// Open the catalog named by `config` and wire up the services
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let db_path = config.database.resolved_path();
        let catalog = app_db::init(&db_path).map_err(|e| AppError::Init(e.to_string()))?;

        Ok(Self::with_catalog(config, catalog))
    }

    /// Build the state around an already opened catalog
    pub fn with_catalog(config: AppConfig, catalog: CatalogDb) -> Self {
        let scanner = Scanner::with_defaults(catalog.clone(), config.scanner.concurrency())
            .with_excluded_dirs(config.scanner.excluded_dirs.iter().cloned());
        tracing::debug!(concurrency = scanner.concurrency(), "Scanner ready");

        Self {
            config: RwLock::new(config),
            tags: TagManager::new(catalog.clone()),
            catalog,
            scanner,
        }
    }

    /// Write the current configuration to `path`.
    ///
    /// The scanner keeps the settings it was built with.
    pub fn save_config(&self, path: &Path) -> anyhow::Result<()> {
        self.config.read().save_to(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_opens_configured_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.database.path = Some(temp_dir.path().join("data").join("index.db"));
        config.scanner.max_concurrency = Some(2);

        let state = AppState::new(config).unwrap();
        assert!(temp_dir.path().join("data").join("index.db").exists());
        assert_eq!(state.scanner.concurrency(), 2);

        let tag = state.tags.create_tag("sunset", "#FF8800").unwrap();
        assert_eq!(state.catalog.get_tag(tag.id).unwrap().map(|t| t.name), Some("sunset".into()));
    }

    #[test]
    fn test_excluded_dirs_reach_scanner_and_persist() {
        let temp_dir = TempDir::new().unwrap();
        let private = temp_dir.path().join("private");
        std::fs::create_dir(&private).unwrap();

        let mut config = AppConfig::default();
        config.database.path = Some(temp_dir.path().join("index.db"));
        config.scanner.excluded_dirs = vec![private.clone()];

        let state = AppState::new(config).unwrap();
        assert!(state.scanner.is_excluded(&private));
        assert!(!state.scanner.is_excluded(temp_dir.path()));

        let config_path = temp_dir.path().join("config.toml");
        state.save_config(&config_path).unwrap();
        let reloaded = AppConfig::load_from(&config_path).unwrap();
        assert_eq!(reloaded.scanner.excluded_dirs, vec![private]);
    }

    #[test]
    fn test_unopenable_catalog_is_init_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        // Parent directory cannot be created over a regular file
        let mut config = AppConfig::default();
        config.database.path = Some(blocker.join("index.db"));

        assert!(matches!(AppState::new(config), Err(AppError::Init(_))));
    }
}
