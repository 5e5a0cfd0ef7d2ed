//! # arcshim ZIP Archive Operations (`common::archive::zip`)
//!
//! File: cli/src/common/archive/zip.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! Embedded replacement for `zip` and `unzip`, built on the `zip` crate. Archives
//! are always built recursively and always extracted with overwrite, which is what
//! the `zip -r` / `unzip -o` invocations sent to host binaries do as well.
//!
//! Entry timestamps come from file modification times (converted to local time,
//! as zip stores DOS timestamps without a zone), so archiving the same tree twice
//! produces identical bytes.
//!
use crate::common::fs::paths;
use crate::core::error::{Result, ShimError};
use anyhow::Context;
use chrono::{Datelike, Timelike};
use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Compression methods accepted by `zip -Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZipMethod {
    Store,
    #[default]
    Deflate,
    Bzip2,
}

impl ZipMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "store" | "stored" => Some(Self::Store),
            "deflate" | "deflated" => Some(Self::Deflate),
            "bzip2" => Some(Self::Bzip2),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Deflate => "deflate",
            Self::Bzip2 => "bzip2",
        }
    }

    fn to_zip(self) -> CompressionMethod {
        match self {
            Self::Store => CompressionMethod::Stored,
            Self::Deflate => CompressionMethod::Deflated,
            Self::Bzip2 => CompressionMethod::Bzip2,
        }
    }
}

/// Method and optional level (`1`..=`9`) for new zip entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZipSettings {
    pub method: ZipMethod,
    pub level: Option<u8>,
}

impl ZipSettings {
    fn file_options(&self) -> SimpleFileOptions {
        let options = SimpleFileOptions::default().compression_method(self.method.to_zip());
        match (self.method, self.level) {
            (ZipMethod::Store, _) | (_, None) => options,
            (_, Some(level)) => options.compression_level(Some(level.into())),
        }
    }
}

fn zip_timestamp(modified: SystemTime) -> zip::DateTime {
    let local: chrono::DateTime<chrono::Local> = modified.into();
    zip::DateTime::from_date_and_time(
        local.year().clamp(1980, 2107) as u16,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .unwrap_or_default()
}

fn entry_options(settings: &ZipSettings, metadata: &fs::Metadata) -> SimpleFileOptions {
    let mut options = settings.file_options();
    if let Ok(modified) = metadata.modified() {
        options = options.last_modified_time(zip_timestamp(modified));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        options = options.unix_permissions(metadata.permissions().mode() & 0o7777);
    }
    options
}

/// Joins archive name components with `/`, as the zip format requires.
fn zip_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn add_path<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    full_path: &Path,
    name: &Path,
    settings: &ZipSettings,
) -> Result<()> {
    let metadata = fs::symlink_metadata(full_path)
        .with_context(|| format!("Cannot stat '{}'", full_path.display()))?;
    let options = entry_options(settings, &metadata);
    let name = zip_name(name);

    if metadata.is_dir() {
        debug!("Adding directory {:?} as {}/", full_path, name);
        zip.add_directory(name.as_str(), options)?;
    } else if metadata.file_type().is_symlink() {
        let target = fs::read_link(full_path)
            .with_context(|| format!("Failed to read link '{}'", full_path.display()))?;
        debug!("Adding symlink {:?} as {}", full_path, name);
        zip.add_symlink(name.as_str(), target.to_string_lossy(), options)?;
    } else {
        debug!("Adding file {:?} as {}", full_path, name);
        zip.start_file(name.as_str(), options)?;
        let mut file = File::open(full_path)
            .with_context(|| format!("Failed to open '{}'", full_path.display()))?;
        io::copy(&mut file, zip)
            .with_context(|| format!("Failed to compress '{}'", full_path.display()))?;
    }
    Ok(())
}

/// # Create ZIP Archive (`create_zip`)
///
/// Writes a zip archive of `sources` (resolved against `base_dir`) into `writer`.
/// Directory sources are recursed in a stable (sorted) order. When the archive
/// is being written below one of the sources, `own_path` (its canonical path)
/// keeps it out of itself.
pub fn create_zip<W: Write + Seek>(
    writer: W,
    base_dir: &Path,
    sources: &[PathBuf],
    settings: ZipSettings,
    own_path: Option<&Path>,
) -> Result<W> {
    let mut zip = ZipWriter::new(writer);

    for source in sources {
        let root = base_dir.join(source);
        let root_name = paths::entry_name(source);
        if !root.exists() && fs::symlink_metadata(&root).is_err() {
            anyhow::bail!(ShimError::FileSystem(format!(
                "zip source not found: {}",
                source.display()
            )));
        }

        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry
                .with_context(|| format!("Failed to walk '{}'", root.display()))?;
            if own_path.is_some_and(|own| paths::is_archive_itself(entry.path(), own)) {
                warn!("{}: file is the archive; not added", entry.path().display());
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&root)
                .context("Walked entry outside of its root")?;
            let name = root_name.join(relative);
            if name.as_os_str().is_empty() {
                continue;
            }
            add_path(&mut zip, entry.path(), &name, &settings)?;
        }
    }

    zip.finish().context("Failed to finalize zip archive")
}

fn is_symlink_mode(mode: Option<u32>) -> bool {
    mode.is_some_and(|m| m & 0o170000 == 0o120000)
}

/// Replaces whatever non-directory sits at `path`. Existing symlinks are
/// removed rather than written through.
fn clear_entry(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if !metadata.is_dir() => fs::remove_file(path)
            .with_context(|| format!("Failed to replace {:?}", path)),
        _ => Ok(()),
    }
}

/// # Extract ZIP Archive (`extract_zip`)
///
/// Extracts every entry of the archive read from `reader` into `dest`,
/// overwriting existing files.
///
/// Directories are created only along paths that resolve inside `dest`, and
/// symlink entries are created after every other entry, so no entry can be
/// written through a link.
///
/// ## Errors
///
/// Returns an `Err` if the archive is malformed or an entry escapes `dest`.
pub fn extract_zip<R: Read + Seek>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(reader).context("Failed to open zip archive")?;
    let root = dest
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", dest.display()))?;
    let mut links = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = paths::enclosed(Path::new(entry.name()))?;
        let mode = entry.unix_mode();

        if entry.is_dir() {
            paths::create_enclosed_dirs(&root, &relative)?;
            continue;
        }
        if is_symlink_mode(mode) {
            let mut target = String::new();
            entry.read_to_string(&mut target)?;
            links.push((relative, target));
            continue;
        }

        let parent = relative.parent().unwrap_or(Path::new(""));
        let out_path = paths::create_enclosed_dirs(&root, parent)?.join(
            relative
                .file_name()
                .context("Archive entry has no file name")?,
        );
        clear_entry(&out_path)?;
        let mut out_file =
            File::create(&out_path).with_context(|| format!("Failed to create {:?}", out_path))?;
        io::copy(&mut entry, &mut out_file)
            .with_context(|| format!("Failed to extract {:?}", relative))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = mode {
                let permissions = fs::Permissions::from_mode(mode & 0o777);
                if let Err(e) = fs::set_permissions(&out_path, permissions) {
                    warn!("Could not set permissions on {:?}: {}", out_path, e);
                }
            }
        }
    }

    for (relative, target) in links {
        let parent = relative.parent().unwrap_or(Path::new(""));
        let out_path = paths::create_enclosed_dirs(&root, parent)?.join(
            relative
                .file_name()
                .context("Archive entry has no file name")?,
        );
        clear_entry(&out_path)?;
        debug!("Linking {:?} -> {}", out_path, target);
        #[cfg(unix)]
        std::os::unix::fs::symlink(&target, &out_path)
            .with_context(|| format!("Failed to create symlink {:?}", out_path))?;
        #[cfg(not(unix))]
        fs::write(&out_path, &target)
            .with_context(|| format!("Failed to create {:?}", out_path))?;
    }
    Ok(())
}
