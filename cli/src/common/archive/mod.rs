//! # arcshim Archive Engine (`common::archive`)
//!
//! File: cli/src/common/archive/mod.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! The embedded archive engine used whenever a host binary is missing or fails.
//! It exposes two file-to-file operations plus format detection:
//!
//! - `archive(format, request, dest)`: build an archive at a filesystem path.
//! - `unarchive(format, src, dest_dir)`: unpack an archive into a directory,
//!   overwriting existing entries.
//! - `detect(path)`: identify an archive from its contents.
//!
//! ## Architecture
//!
//! - **`compression`**: stream codecs for tarballs (gzip, bzip2, xz, zstd).
//! - **`format`**: `ArchiveFormat` and magic-byte sniffing.
//! - **`tar`**: tarball creation and extraction (`tar` crate).
//! - **`zip`**: zip creation and extraction (`zip` crate).
//! - **`rar`**: rar extraction (`unrar` crate).
//!
//! Both operations work on real paths. Callers that deal with standard streams
//! stage them through temporary files first.
//!
//! ## Usage
//!
//! ```rust
//! use arcshim::common::archive::{self, format::ArchiveFormat, CreateRequest};
//! use arcshim::common::archive::compression::Compression;
//! use std::path::{Path, PathBuf};
//!
//! # fn main() -> arcshim::core::error::Result<()> {
//! # let temp_dir = tempfile::tempdir()?;
//! # std::fs::write(temp_dir.path().join("notes.txt"), "hi")?;
//! let sources = vec![PathBuf::from("notes.txt")];
//! let request = CreateRequest::new(temp_dir.path(), &sources);
//! let dest = temp_dir.path().join("notes.tar.gz");
//! archive::archive(ArchiveFormat::Tar(Compression::Gzip), &request, &dest)?;
//!
//! assert_eq!(archive::detect(&dest)?, Some(ArchiveFormat::Tar(Compression::Gzip)));
//! archive::unarchive(ArchiveFormat::Tar(Compression::Gzip), &dest, &temp_dir.path().join("out"))?;
//! # Ok(())
//! # }
//! ```
//!
pub mod compression;
pub mod format;
pub mod rar;
pub mod tar;
pub mod zip;

use self::format::ArchiveFormat;
use self::zip::ZipSettings;
use crate::common::fs::io;
use crate::core::error::{Result, ShimError};
use anyhow::Context;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// What to put into a new archive.
#[derive(Debug, Clone)]
pub struct CreateRequest<'a> {
    /// Directory the sources are resolved against.
    pub base_dir: &'a Path,
    /// Sources as given on the command line.
    pub sources: &'a [PathBuf],
    /// Entry settings, only used for zip archives.
    pub zip: ZipSettings,
}

impl<'a> CreateRequest<'a> {
    pub fn new(base_dir: &'a Path, sources: &'a [PathBuf]) -> Self {
        Self {
            base_dir,
            sources,
            zip: ZipSettings::default(),
        }
    }

    pub fn with_zip_settings(mut self, zip: ZipSettings) -> Self {
        self.zip = zip;
        self
    }
}

fn unsupported(format: ArchiveFormat) -> anyhow::Error {
    ShimError::UnsupportedFormat {
        format: format.name().to_string(),
    }
    .into()
}

/// Identifies the archive at `path` from its contents.
pub fn detect(path: &Path) -> Result<Option<ArchiveFormat>> {
    format::detect_file(path)
}

/// # Build Archive (`archive`)
///
/// Creates (or truncates) `dest` and writes an archive of `request.sources` in
/// `format` into it.
///
/// ## Errors
///
/// Returns `ShimError::UnsupportedFormat` for formats the engine cannot write,
/// and I/O errors for unreadable sources or an unwritable destination.
pub fn archive(format: ArchiveFormat, request: &CreateRequest<'_>, dest: &Path) -> Result<()> {
    if !format.can_create() {
        return Err(unsupported(format));
    }
    info!(
        "Embedded engine creating {} archive at {}",
        format,
        dest.display()
    );
    let file = File::create(dest)
        .with_context(|| format!("Failed to create archive file {}", dest.display()))?;
    // Sources may contain the destination itself (`tar czf out.tgz .`).
    let own_path = dest.canonicalize().ok();

    match format {
        ArchiveFormat::Tar(compression) => {
            let writer = tar::create_tar(
                BufWriter::new(file),
                request.base_dir,
                request.sources,
                compression,
                own_path.as_deref(),
            )?;
            writer
                .into_inner()
                .map_err(|e| e.into_error())
                .with_context(|| format!("Failed to flush {}", dest.display()))?
                .sync_all()?;
        }
        ArchiveFormat::Zip => {
            zip::create_zip(
                file,
                request.base_dir,
                request.sources,
                request.zip,
                own_path.as_deref(),
            )?
            .sync_all()?;
        }
        ArchiveFormat::Rar | ArchiveFormat::SevenZip => return Err(unsupported(format)),
    }
    Ok(())
}

/// # Unpack Archive (`unarchive`)
///
/// Unpacks the `format` archive at `src` into `dest_dir` (created if missing),
/// overwriting existing entries.
pub fn unarchive(format: ArchiveFormat, src: &Path, dest_dir: &Path) -> Result<()> {
    if !format.can_extract() {
        return Err(unsupported(format));
    }
    io::ensure_dir_exists(dest_dir)?;
    info!(
        "Embedded engine extracting {} archive {} into {}",
        format,
        src.display(),
        dest_dir.display()
    );
    let open = || {
        File::open(src).with_context(|| format!("Failed to open archive {}", src.display()))
    };

    match format {
        ArchiveFormat::Tar(compression) => {
            tar::unpack_tar(BufReader::new(open()?), dest_dir, compression)
        }
        ArchiveFormat::Zip => zip::extract_zip(BufReader::new(open()?), dest_dir),
        ArchiveFormat::Rar => rar::extract_rar(src, dest_dir),
        ArchiveFormat::SevenZip => Err(unsupported(format)),
    }
}
