//! TagFiler Core Domain Logic
//!
//! This crate contains:
//! - Application state
//! - Configuration
//! - Error types
//! - Resource cache and loaders
//! - Directory scanner and its event channel
//! - Tag association manager

pub mod state;
pub mod config;
pub mod error;
pub mod events;
pub mod resource;
pub mod scanner;
pub mod tags;

pub use state::AppState;
pub use config::{AppConfig, DatabaseConfig, ScannerConfig, LoggingConfig, default_concurrency};
pub use error::AppError;
pub use events::{EventQueue, EventSender, ScanEvent, ScanSummary};
pub use resource::{
    get_or_load, FsLoader, LoadSource, MemoryResourceCache, Resource, ResourceCache, ResourceLoader,
};
pub use scanner::Scanner;
pub use tags::{TagColor, TagManager};
