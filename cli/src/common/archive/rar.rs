//! # arcshim RAR Extraction (`common::archive::rar`)
//!
//! File: cli/src/common/archive/rar.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! Extraction-only support for RAR archives through the `unrar` crate (the
//! format cannot be written without the proprietary encoder).
//!
use crate::common::fs::paths;
use crate::core::error::Result;
use anyhow::anyhow;
use std::fs;
use std::path::Path;
use tracing::debug;

fn rar_error(path: &Path, err: unrar::error::UnrarError) -> anyhow::Error {
    anyhow!("Failed to read rar archive {}: {}", path.display(), err)
}

/// Extracts every entry of the RAR archive at `archive_path` into `dest`,
/// overwriting existing files.
pub fn extract_rar(archive_path: &Path, dest: &Path) -> Result<()> {
    let mut archive = unrar::Archive::new(archive_path)
        .open_for_processing()
        .map_err(|e| rar_error(archive_path, e))?;

    while let Some(header) = archive.read_header().map_err(|e| rar_error(archive_path, e))? {
        let relative = paths::enclosed(&header.entry().filename)?;
        let out_path = dest.join(&relative);

        archive = if header.entry().is_directory() {
            fs::create_dir_all(&out_path)?;
            header.skip().map_err(|e| rar_error(archive_path, e))?
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            debug!("Extracting {:?}", relative);
            header
                .extract_to(&out_path)
                .map_err(|e| rar_error(archive_path, e))?
        };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_extract_rar_rejects_non_rar() {
        let temp_dir = tempdir().unwrap();
        let bogus = temp_dir.path().join("bogus.rar");
        fs::write(&bogus, b"definitely not a rar archive").unwrap();
        let err = extract_rar(&bogus, temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to read rar archive"));
    }
}
