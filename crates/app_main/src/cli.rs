//! Command definitions and their handlers
//!
//! Handlers write plain text to `out` so they can be exercised without a terminal.

use app_core::{AppError, AppState, EventQueue, ScanEvent};
use app_fs::ArchiveCodec;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "tagfiler", version, about = "Tag images and keep them in a local catalog")]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "TAGFILER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Catalog database file, overriding the configuration
    #[arg(long, global = true, env = "TAGFILER_DB")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register and load every image directly inside a directory
    Scan {
        /// Directory to scan
        dir: PathBuf,

        /// Maximum simultaneous file reads
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Create and inspect tags
    Tags {
        #[command(subcommand)]
        command: TagCommands,
    },

    /// Attach a tag to an image, registering the image if needed
    Attach { image: PathBuf, tag_id: i64 },

    /// Detach a tag from an image
    Detach { image: PathBuf, tag_id: i64 },

    /// List images carrying a tag with this exact name
    Search { tag: String },

    /// Exclude a directory from scanning, or list the excluded directories
    Exclude {
        /// Directory to add; lists the current exclusions when omitted
        dir: Option<PathBuf>,
    },

    /// Pack files into a compressed tar archive
    Archive {
        /// Archive to write; the codec's extension is added when it has none
        dest: PathBuf,

        /// Files to include; each is stored under its file name
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// gzip or bzip2
        #[arg(long, default_value = "gzip")]
        codec: ArchiveCodec,
    },
}

#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// List every tag
    List,

    /// Create a tag
    Create {
        name: String,

        /// Display color as #RRGGBB
        #[arg(long, default_value = "#FFFFFF")]
        color: String,
    },

    /// Tags attached to an image
    Of { image: PathBuf },

    /// Tags not yet attached to an image
    Available { image: PathBuf },
}

/// Execute one command against an opened state. `config_path` is where settings changes are saved.
pub fn run<W: Write>(
    state: &AppState,
    config_path: &Path,
    command: Commands,
    out: &mut W,
) -> Result<(), AppError> {
    match command {
        Commands::Scan { dir, .. } => scan(state, &dir, out),
        Commands::Tags { command } => tags(state, command, out),
        Commands::Attach { image, tag_id } => {
            if state.catalog.get_tag(tag_id)?.is_none() {
                return Err(AppError::Validation(format!("No tag with id {}", tag_id)));
            }
            let image_id = state.tags.register_image(&canonical(&image))?;
            state.tags.attach_tag(image_id, tag_id)?;
            writeln!(out, "attached tag {} to {}", tag_id, image.display())?;
            Ok(())
        }
        Commands::Detach { image, tag_id } => {
            if let Some(image_id) = state.tags.image_id(&canonical(&image))? {
                state.tags.detach_tag(image_id, tag_id)?;
            }
            writeln!(out, "detached tag {} from {}", tag_id, image.display())?;
            Ok(())
        }
        Commands::Search { tag } => {
            for path in state.tags.search_images_by_tag(&tag)? {
                writeln!(out, "{}", path)?;
            }
            Ok(())
        }
        Commands::Exclude { dir } => exclude(state, config_path, dir, out),
        Commands::Archive { dest, files, codec } => {
            let dest = if dest.extension().is_none() {
                dest.with_extension(codec.extension())
            } else {
                dest
            };
            let count = app_fs::create_archive(&files, &dest, codec)?;
            writeln!(out, "{} files written to {}", count, dest.display())?;
            Ok(())
        }
    }
}

fn tags<W: Write>(state: &AppState, command: TagCommands, out: &mut W) -> Result<(), AppError> {
    let listed = match command {
        TagCommands::List => state.tags.list_tags()?,
        TagCommands::Create { name, color } => {
            let tag = state.tags.create_tag(&name, &color)?;
            writeln!(out, "{}", tag.id)?;
            return Ok(());
        }
        TagCommands::Of { image } => match state.tags.image_id(&canonical(&image))? {
            Some(image_id) => state.tags.tags_for_image(image_id)?,
            None => Vec::new(),
        },
        TagCommands::Available { image } => match state.tags.image_id(&canonical(&image))? {
            Some(image_id) => state.tags.tags_not_applied(image_id)?,
            None => state.tags.list_tags()?,
        },
    };

    for tag in listed {
        writeln!(out, "{}\t{}\t{}", tag.id, tag.color, tag.name)?;
    }
    Ok(())
}

fn exclude<W: Write>(
    state: &AppState,
    config_path: &Path,
    dir: Option<PathBuf>,
    out: &mut W,
) -> Result<(), AppError> {
    if let Some(dir) = dir {
        let dir = canonical(&dir);
        {
            let mut config = state.config.write();
            if !config.scanner.excluded_dirs.contains(&dir) {
                config.scanner.excluded_dirs.push(dir);
            }
        }
        state
            .save_config(config_path)
            .map_err(|e| AppError::Config(e.to_string()))?;
    }

    for dir in &state.config.read().scanner.excluded_dirs {
        writeln!(out, "{}", dir.display())?;
    }
    Ok(())
}

/// Run a scan on a worker runtime while this thread drains the event queue
fn scan<W: Write>(state: &AppState, dir: &Path, out: &mut W) -> Result<(), AppError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("tagfiler-worker")
        .build()?;

    let (tx, queue) = EventQueue::channel();
    let scanner = state.scanner.clone();
    let dir = canonical(dir);
    let task = runtime.spawn({
        let dir = dir.clone();
        async move { scanner.scan(&dir, &tx).await }
    });

    let mut write_error = None;
    let _ = queue.wait_for_completion(|event| {
        if let Err(e) = print_event(out, event) {
            write_error.get_or_insert(e);
        }
    });

    let summary = runtime
        .block_on(task)
        .map_err(|e| AppError::SystemResource(e.to_string()))??;
    if let Some(e) = write_error {
        return Err(e.into());
    }

    if summary.excluded {
        writeln!(out, "{}: excluded, nothing scanned", summary.dir.display())?;
        return Ok(());
    }

    writeln!(
        out,
        "{}: {} images, {} loaded ({} cached), {} failed",
        summary.dir.display(),
        summary.launched,
        summary.loaded,
        summary.cached,
        summary.failed
    )?;
    let cache = state.scanner.cache();
    writeln!(out, "cache: {} files, {} bytes", cache.len(), cache.memory_usage())?;
    Ok(())
}

fn print_event<W: Write>(out: &mut W, event: &ScanEvent) -> std::io::Result<()> {
    match event {
        ScanEvent::ImageLoaded { path, resource, .. } => {
            let size = match resource.dimensions() {
                Ok((w, h)) => format!("{}x{}", w, h),
                Err(_) => "?".to_string(),
            };
            writeln!(out, "loaded\t{}\t{}\t{} bytes", path.display(), size, resource.len())
        }
        ScanEvent::LoadFailed { path, error, .. } => {
            writeln!(out, "failed\t{}\t{}", path.display(), error)
        }
        ScanEvent::ScanCompleted(_) => Ok(()),
    }
}

/// Absolute form of `path` so one file always maps to one catalog row
fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
