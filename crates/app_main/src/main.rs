//! TagFiler - Image Tag Catalog
//!
//! Command-line entry point.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging and panic hook first; the guard flushes the log file on exit
    let _log_guard = app_log::init()?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(app_core::AppConfig::config_path);
    let mut config = match app_core::AppConfig::load_from(&config_path) {
        Ok(config) => config,
        // An explicitly named file must load
        Err(e) if cli.config.is_some() => return Err(e),
        Err(e) => {
            tracing::warn!("Failed to load configuration, using defaults: {}", e);
            app_core::AppConfig::default()
        }
    };

    if let Err(e) = app_log::cleanup_old_logs(&app_log::log_dir(), config.logging.retention_days) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    if let Some(path) = cli.database {
        config.database.path = Some(path);
    }
    if let Commands::Scan { jobs: Some(jobs), .. } = &cli.command {
        config.scanner.max_concurrency = Some(*jobs);
    }

    tracing::info!("TagFiler starting...");

    // A catalog that cannot be opened is fatal
    let state = app_core::AppState::new(config)?;

    let mut out = std::io::stdout().lock();
    match cli::run(&state, &config_path, cli.command, &mut out) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!("Command failed: {}", e);
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}
