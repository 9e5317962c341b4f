//! TagFiler Logging & Observability Module
//!
//! Provides structured logging, panic handling, crash reports, and deadlock detection.

mod panic_hook;
mod logging;

pub use panic_hook::{init_panic_hook, crash_report};
pub use logging::{init_logging, cleanup_old_logs, LogGuard};

use std::path::PathBuf;
use directories::ProjectDirs;

/// Get the application log directory
pub fn log_dir() -> PathBuf {
    ProjectDirs::from("com", "TagFiler", "TagFiler")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialize all observability features.
///
/// The returned guard flushes the file writer when dropped; keep it alive in `main`.
pub fn init() -> anyhow::Result<LogGuard> {
    let guard = init_logging(&log_dir())?;
    init_panic_hook();

    #[cfg(debug_assertions)]
    init_deadlock_detector();

    Ok(guard)
}

#[cfg(debug_assertions)]
fn init_deadlock_detector() {
    use std::thread;
    use std::time::Duration;

    thread::Builder::new()
        .name("deadlock-detector".into())
        .spawn(|| loop {
            thread::sleep(Duration::from_secs(10));
            let deadlocks = parking_lot::deadlock::check_deadlock();
            if deadlocks.is_empty() {
                continue;
            }
            tracing::error!(count = deadlocks.len(), "Deadlock detected!");
            for (i, threads) in deadlocks.iter().enumerate() {
                for t in threads {
                    tracing::error!(cycle = i, thread_id = ?t.thread_id(), "{:#?}", t.backtrace());
                }
            }
        })
        .map(|_| ())
        .unwrap_or_else(|e| tracing::warn!("Deadlock detector not started: {}", e));
}
