//! # arcshim Archive Path Helpers
//!
//! File: cli/src/common/fs/paths.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!

//! ## Overview
//!
//! Path rules shared by the archive writers and readers:
//! - `entry_name` turns a source path given on the command line into the name it
//!   is stored under (leading `/` and `./` dropped, like `tar` does).
//! - `enclosed` validates a name read from an archive and returns it as a
//!   relative path that cannot escape the extraction directory.
//! - `create_enclosed_dirs` creates the directories for such a path without
//!   following anything (a symlink, usually) that leads out of the destination.
//! - `is_archive_itself` spots the archive being written while walking sources.
//!
use crate::core::error::{Result, ShimError};
use anyhow::Context;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Name under which `source` is stored in a new archive.
///
/// Returns an empty path for sources such as `.` or `/`, meaning "the contents of
/// this directory, at the archive root".
pub fn entry_name(source: &Path) -> PathBuf {
    source
        .components()
        .filter(|component| {
            !matches!(
                component,
                Component::RootDir | Component::Prefix(_) | Component::CurDir
            )
        })
        .collect()
}

/// Validates an archive entry name and returns it as a safe relative path.
///
/// # Errors
///
/// Returns `ShimError::FileSystem` if the name is absolute, contains `..`, or is
/// empty once `.` components are removed.
pub fn enclosed(name: &Path) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in name.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(escapes(name));
            }
        }
    }
    if relative.as_os_str().is_empty() {
        anyhow::bail!(ShimError::FileSystem(format!(
            "Archive entry has an empty name: {:?}",
            name
        )));
    }
    Ok(relative)
}

fn escapes(path: &Path) -> anyhow::Error {
    ShimError::FileSystem(format!(
        "Archive entry escapes the destination directory: {}",
        path.display()
    ))
    .into()
}

/// # Create Enclosed Directories (`create_enclosed_dirs`)
///
/// Creates `relative` (an `enclosed` path) below `root` one component at a time
/// and returns the full path. Existing components are resolved, and each must
/// still lie inside `root`.
///
/// `root` must be canonical.
///
/// # Errors
///
/// Returns `ShimError::FileSystem` if a component resolves outside `root` (a
/// symlink pointing elsewhere), or an I/O error if a directory cannot be created.
pub fn create_enclosed_dirs(root: &Path, relative: &Path) -> Result<PathBuf> {
    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(_) => {
                let resolved = current
                    .canonicalize()
                    .with_context(|| format!("Failed to resolve {}", current.display()))?;
                if !resolved.starts_with(root) {
                    return Err(escapes(&current));
                }
                if !resolved.is_dir() {
                    anyhow::bail!(ShimError::FileSystem(format!(
                        "Not a directory: {}",
                        current.display()
                    )));
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir(&current)
                    .with_context(|| format!("Failed to create {}", current.display()))?;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Cannot stat {}", current.display())));
            }
        }
    }
    Ok(current)
}

/// Whether `candidate` is the archive at `archive` (a canonical path). Only
/// entries with the same file name are resolved.
pub fn is_archive_itself(candidate: &Path, archive: &Path) -> bool {
    candidate.file_name() == archive.file_name()
        && candidate
            .canonicalize()
            .is_ok_and(|resolved| resolved == archive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name_strips_root_and_dot() {
        assert_eq!(entry_name(Path::new("/etc/hosts")), PathBuf::from("etc/hosts"));
        assert_eq!(entry_name(Path::new("./src/lib.rs")), PathBuf::from("src/lib.rs"));
        assert_eq!(entry_name(Path::new("dir1")), PathBuf::from("dir1"));
        assert_eq!(entry_name(Path::new(".")), PathBuf::new());
    }

    #[test]
    fn test_enclosed_accepts_relative() {
        assert_eq!(
            enclosed(Path::new("./a/b.txt")).unwrap(),
            PathBuf::from("a/b.txt")
        );
    }

    #[test]
    fn test_enclosed_rejects_escapes() {
        assert!(enclosed(Path::new("../evil")).is_err());
        assert!(enclosed(Path::new("a/../../evil")).is_err());
        assert!(enclosed(Path::new("/etc/passwd")).is_err());
        assert!(enclosed(Path::new(".")).is_err());
    }

    #[test]
    fn test_create_enclosed_dirs() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path().canonicalize()?;
        let created = create_enclosed_dirs(&root, Path::new("a/b"))?;
        assert_eq!(created, root.join("a/b"));
        assert!(created.is_dir());
        // Existing directories are fine.
        create_enclosed_dirs(&root, Path::new("a"))?;
        assert_eq!(create_enclosed_dirs(&root, Path::new(""))?, root);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_create_enclosed_dirs_refuses_outbound_symlink() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let outside = tempfile::tempdir()?;
        let root = temp_dir.path().canonicalize()?;
        std::os::unix::fs::symlink(outside.path(), root.join("link"))?;
        std::os::unix::fs::symlink(root.join("a"), root.join("inward"))?;
        fs::create_dir(root.join("a"))?;

        let err = create_enclosed_dirs(&root, Path::new("link/sub")).unwrap_err();
        assert!(err.to_string().contains("escapes"));
        assert!(!outside.path().join("sub").exists());
        // A link that stays inside the destination is followed.
        create_enclosed_dirs(&root, Path::new("inward/sub"))?;
        assert!(root.join("a/sub").is_dir());
        Ok(())
    }

    #[test]
    fn test_is_archive_itself() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let archive = temp_dir.path().join("out.zip");
        fs::write(&archive, "")?;
        fs::create_dir(temp_dir.path().join("sub"))?;
        fs::write(temp_dir.path().join("sub/out.zip"), "")?;
        let canonical = archive.canonicalize()?;

        assert!(is_archive_itself(&temp_dir.path().join("./out.zip"), &canonical));
        assert!(!is_archive_itself(&temp_dir.path().join("sub/out.zip"), &canonical));
        assert!(!is_archive_itself(&temp_dir.path().join("sub"), &canonical));
        Ok(())
    }
}
