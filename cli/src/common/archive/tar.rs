//! # arcshim TAR Archive Operations (`common::archive::tar`)
//!
//! File: cli/src/common/archive/tar.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! Embedded replacement for `tar -c` and `tar -x`, built on the `tar` crate with
//! the stream codecs from `compression`.
//!
//! ## Architecture
//!
//! - **Creation** resolves each source against a base directory (the `-C` value)
//!   and stores it under the name it was given, minus any leading `/` or `./`.
//!   Directories are recursed in sorted order, symlinks are stored as links, and
//!   the archive being written is never added to itself.
//! - **Extraction** unpacks into the destination directory, overwriting existing
//!   files. Entries that would land outside the destination are skipped by the
//!   `tar` crate.
//!
//! ## Usage
//!
//! ```rust
//! use arcshim::common::archive::{compression::Compression, tar};
//! use std::path::{Path, PathBuf};
//!
//! # fn main() -> arcshim::core::error::Result<()> {
//! # let temp_dir = tempfile::tempdir()?;
//! # std::fs::create_dir(temp_dir.path().join("src"))?;
//! let file = std::fs::File::create(temp_dir.path().join("out.tar.gz"))?;
//! tar::create_tar(file, temp_dir.path(), &[PathBuf::from("src")], Compression::Gzip, None)?;
//! # Ok(())
//! # }
//! ```
//!
use super::compression::Compression;
use crate::common::fs::paths;
use crate::core::error::{Result, ShimError};
use anyhow::Context;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// # Create TAR Archive (`create_tar`)
///
/// Writes a tarball of `sources` (relative to `base_dir`) into `writer`.
///
/// ## Arguments
///
/// * `writer` - Destination stream (a file, a staging file, ...).
/// * `base_dir` - Directory the sources are resolved against (`tar -C`).
/// * `sources` - Paths to add, as given on the command line.
/// * `compression` - Outer compression; must be embedded.
/// * `own_path` - Canonical path of the archive file when it is written to
///   disk. A source tree containing it skips it, like `tar` does.
///
/// ## Returns
///
/// * `Result<W>` - The inner writer once the archive and compression trailers
///   have been written.
///
/// ## Errors
///
/// Returns an `Err` if a source is missing or unreadable, or if the compression
/// method has no embedded implementation.
pub fn create_tar<W: Write>(
    writer: W,
    base_dir: &Path,
    sources: &[PathBuf],
    compression: Compression,
    own_path: Option<&Path>,
) -> Result<W> {
    let encoder = compression.encoder(writer)?;
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    let is_own = |path: &Path| own_path.is_some_and(|own| paths::is_archive_itself(path, own));

    for source in sources {
        let full_path = base_dir.join(source);
        let name = paths::entry_name(source);
        let metadata = fs::symlink_metadata(&full_path).with_context(|| {
            format!("Cannot stat '{}': No such file or directory", source.display())
        })?;

        if metadata.is_dir() {
            let dir_name = if name.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                name
            };
            debug!("Adding directory {:?} as {:?}", full_path, dir_name);
            for entry in WalkDir::new(&full_path).sort_by_file_name() {
                let entry = entry
                    .with_context(|| format!("Failed to walk '{}'", full_path.display()))?;
                if is_own(entry.path()) {
                    warn!("{}: file is the archive; not dumped", entry.path().display());
                    continue;
                }
                let relative = entry
                    .path()
                    .strip_prefix(&full_path)
                    .context("Walked entry outside of its root")?;
                let entry_name = if relative.as_os_str().is_empty() {
                    dir_name.clone()
                } else {
                    dir_name.join(relative)
                };
                builder
                    .append_path_with_name(entry.path(), &entry_name)
                    .with_context(|| {
                        format!(
                            "Failed to add '{}' to the tar archive",
                            entry.path().display()
                        )
                    })?;
            }
        } else {
            if name.as_os_str().is_empty() {
                anyhow::bail!(ShimError::FileSystem(format!(
                    "Cannot archive '{}' without a name",
                    source.display()
                )));
            }
            if is_own(&full_path) {
                warn!("{}: file is the archive; not dumped", full_path.display());
                continue;
            }
            debug!("Adding {:?} as {:?}", full_path, name);
            builder
                .append_path_with_name(&full_path, &name)
                .with_context(|| {
                    format!("Failed to add '{}' to the tar archive", full_path.display())
                })?;
        }
    }

    let encoder = builder
        .into_inner()
        .context("Failed to finalize tar archive structure")?;
    encoder
        .finish()
        .with_context(|| format!("Failed to finish {} compression stream", compression))
}

/// # Unpack TAR Archive (`unpack_tar`)
///
/// Decodes `reader` with `compression` and unpacks every entry into `dest`,
/// overwriting existing files. `dest` must already exist.
pub fn unpack_tar<R: Read>(reader: R, dest: &Path, compression: Compression) -> Result<()> {
    let decoder = compression.decoder(reader)?;
    let mut archive = tar::Archive::new(decoder);
    archive.set_overwrite(true);
    archive.set_preserve_mtime(true);
    archive
        .unpack(dest)
        .with_context(|| format!("Failed to unpack tar archive into {}", dest.display()))?;
    Ok(())
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn entry_names(data: &[u8], compression: Compression) -> HashSet<String> {
        let mut archive = tar::Archive::new(compression.decoder(data).unwrap());
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let entry = entry.unwrap();
                let path = entry.path().unwrap().to_path_buf();
                path.to_string_lossy()
                    .trim_end_matches('/')
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_create_tar_named_sources() -> Result<()> {
        let temp_dir = tempdir()?;
        let base = temp_dir.path();
        fs::create_dir_all(base.join("dir1/nested"))?;
        fs::write(base.join("dir1/nested/file1.txt"), "hello")?;
        fs::write(base.join("top.txt"), "world")?;

        let data = create_tar(
            Vec::new(),
            base,
            &[PathBuf::from("./dir1"), PathBuf::from("top.txt")],
            Compression::Gzip,
            None,
        )?;

        let names = entry_names(&data, Compression::Gzip);
        assert!(names.contains("dir1"));
        assert!(names.contains("dir1/nested/file1.txt"));
        assert!(names.contains("top.txt"));
        Ok(())
    }

    #[test]
    fn test_create_tar_missing_source() {
        let temp_dir = tempdir().unwrap();
        let err = create_tar(
            Vec::new(),
            temp_dir.path(),
            &[PathBuf::from("absent")],
            Compression::None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("absent"));
    }

    #[test]
    fn test_unpack_overwrites_existing() -> Result<()> {
        let src = tempdir()?;
        fs::write(src.path().join("conf.txt"), "new contents")?;
        let data = create_tar(
            Vec::new(),
            src.path(),
            &[PathBuf::from("conf.txt")],
            Compression::Xz,
            None,
        )?;

        let dest = tempdir()?;
        fs::write(dest.path().join("conf.txt"), "old")?;
        unpack_tar(data.as_slice(), dest.path(), Compression::Xz)?;

        assert_eq!(
            fs::read_to_string(dest.path().join("conf.txt"))?,
            "new contents"
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_stored_as_links() -> Result<()> {
        let src = tempdir()?;
        fs::write(src.path().join("target.txt"), "t")?;
        std::os::unix::fs::symlink("target.txt", src.path().join("link"))?;
        let data = create_tar(
            Vec::new(),
            src.path(),
            &[PathBuf::from("link"), PathBuf::from("target.txt")],
            Compression::None,
            None,
        )?;

        let dest = tempdir()?;
        unpack_tar(data.as_slice(), dest.path(), Compression::None)?;
        let link = dest.path().join("link");
        assert!(fs::symlink_metadata(&link)?.file_type().is_symlink());
        assert_eq!(fs::read_link(&link)?, PathBuf::from("target.txt"));
        Ok(())
    }

    #[test]
    fn test_create_skips_the_archive_being_written() -> Result<()> {
        let src = tempdir()?;
        fs::write(src.path().join("a.txt"), vec![b'a'; 200 * 1024])?;
        let dest = src.path().join("out.tar.gz");
        let file = fs::File::create(&dest)?;
        let own = dest.canonicalize()?;

        create_tar(
            file,
            src.path(),
            &[PathBuf::from("."), PathBuf::from("out.tar.gz")],
            Compression::Gzip,
            Some(&own),
        )?;

        let names = entry_names(&fs::read(&dest)?, Compression::Gzip);
        assert_eq!(names, HashSet::from([".".to_string(), "a.txt".to_string()]));
        Ok(())
    }
}
