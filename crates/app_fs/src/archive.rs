//! Compressed tar archive creation

use crate::{FsError, Result};
use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Compression applied around the tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveCodec {
    Gzip,
    Bzip2,
}

impl ArchiveCodec {
    /// Conventional file extension for this codec
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveCodec::Gzip => "tar.gz",
            ArchiveCodec::Bzip2 => "tar.bz2",
        }
    }
}

impl FromStr for ArchiveCodec {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gz" | "gzip" | "tgz" => Ok(ArchiveCodec::Gzip),
            "bz2" | "bzip2" | "tbz2" => Ok(ArchiveCodec::Bzip2),
            other => Err(FsError::Archive(format!("Unknown archive codec: {}", other))),
        }
    }
}

/// Write `files` into a compressed tar archive at `dest`.
///
/// Each file is stored under its file name only. The archive is not
/// created if any input is missing or is not a regular file.
pub fn create_archive(files: &[PathBuf], dest: &Path, codec: ArchiveCodec) -> Result<usize> {
    for file in files {
        if !file.is_file() {
            return Err(FsError::NotFound(file.display().to_string()));
        }
    }

    let out = BufWriter::new(File::create(dest).map_err(|e| FsError::from_io(e, dest))?);

    match codec {
        ArchiveCodec::Gzip => {
            let encoder = GzEncoder::new(out, flate2::Compression::default());
            let encoder = append_files(encoder, files)?;
            encoder.finish()?.flush()?;
        }
        ArchiveCodec::Bzip2 => {
            let encoder = BzEncoder::new(out, bzip2::Compression::default());
            let encoder = append_files(encoder, files)?;
            encoder.finish()?.flush()?;
        }
    }

    tracing::info!(
        dest = %dest.display(),
        count = files.len(),
        codec = ?codec,
        "Archive written"
    );
    Ok(files.len())
}

fn append_files<W: Write>(writer: W, files: &[PathBuf]) -> Result<W> {
    let mut builder = tar::Builder::new(writer);

    for file in files {
        let name = file
            .file_name()
            .ok_or_else(|| FsError::InvalidPath(file.display().to_string()))?;
        let mut handle = File::open(file).map_err(|e| FsError::from_io(e, file))?;
        builder
            .append_file(name, &mut handle)
            .map_err(|e| FsError::Archive(format!("{}: {}", file.display(), e)))?;
    }

    builder
        .into_inner()
        .map_err(|e| FsError::Archive(e.to_string()))
}
