//! # arcshim Filesystem I/O Operations
//!
//! File: cli/src/common/fs/io.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!

//! ## Overview
//!
//! Small wrappers around `std::fs` and `std::io` used by the execution engine:
//! - **`ensure_dir_exists`**: `mkdir -p`, failing if the path is a non-directory.
//! - **`stream_file`**: copies a staged file into a caller-provided writer (used to
//!   deliver archives built for standard output).
//! - **`copy_partial`**: copies a reader into a writer, reporting how many bytes
//!   made it across even when the reader fails midway. Stdin staging relies on
//!   this to keep whatever input was received before an error.
//!
use crate::core::error::{Result, ShimError};
use anyhow::Context;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Ensures that a directory exists at the specified path.
///
/// If the path does not exist it is created, including parents (like `mkdir -p`).
/// If the path exists but is not a directory, `ShimError::FileSystem` is returned.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {:?}", path))?;
        info!("Created directory: {:?}", path);
    } else if !path.is_dir() {
        anyhow::bail!(ShimError::FileSystem(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    } else {
        debug!("Directory already exists: {:?}", path);
    }
    Ok(())
}

/// Streams the full contents of `path` into `writer` and flushes it.
///
/// # Returns
///
/// * `Result<u64>` - Number of bytes written.
pub fn stream_file(path: &Path, writer: &mut dyn Write) -> Result<u64> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open staged file {:?}", path))?;
    let copied = io::copy(&mut file, writer)
        .with_context(|| format!("Failed to stream staged file {:?}", path))?;
    writer.flush().context("Failed to flush output stream")?;
    debug!("Streamed {} bytes from {:?}", copied, path);
    Ok(copied)
}

/// Result of a copy that may have been cut short by a read error.
#[derive(Debug)]
pub struct PartialCopy {
    pub bytes: u64,
    pub error: Option<io::Error>,
}

/// Copies `reader` into `writer` until EOF or the first read error.
///
/// Read errors are returned inside `PartialCopy` together with the byte count so
/// the caller can decide whether the data received so far is usable. Write
/// errors are returned as a hard `Err`.
pub fn copy_partial(reader: &mut dyn Read, writer: &mut dyn Write) -> Result<PartialCopy> {
    let mut buf = [0u8; 64 * 1024];
    let mut bytes = 0u64;
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Ok(PartialCopy {
                    bytes,
                    error: Some(e),
                })
            }
        };
        writer
            .write_all(&buf[..read])
            .context("Failed to write to staging file")?;
        bytes += read as u64;
    }
    writer.flush().context("Failed to flush staging file")?;
    Ok(PartialCopy { bytes, error: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    /// Yields its payload once, then fails.
    struct FailingReader {
        payload: Option<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.payload.take() {
                Some(data) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(data.len())
                }
                None => Err(io::Error::new(ErrorKind::BrokenPipe, "stream reset")),
            }
        }
    }

    #[test]
    fn test_ensure_dir_exists_creates_nested() {
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("a/b/c");
        ensure_dir_exists(&nested).unwrap();
        assert!(nested.is_dir());
        // Second call is a no-op.
        ensure_dir_exists(&nested).unwrap();
    }

    #[test]
    fn test_ensure_dir_exists_rejects_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("file");
        fs::write(&file_path, "x").unwrap();
        let err = ensure_dir_exists(&file_path).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_copy_partial_complete() {
        let mut reader = Cursor::new(b"hello world".to_vec());
        let mut out = Vec::new();
        let copied = copy_partial(&mut reader, &mut out).unwrap();
        assert_eq!(copied.bytes, 11);
        assert!(copied.error.is_none());
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn test_copy_partial_keeps_bytes_before_error() {
        let mut reader = FailingReader {
            payload: Some(b"abc".to_vec()),
        };
        let mut out = Vec::new();
        let copied = copy_partial(&mut reader, &mut out).unwrap();
        assert_eq!(copied.bytes, 3);
        assert_eq!(copied.error.unwrap().kind(), ErrorKind::BrokenPipe);
        assert_eq!(out, b"abc");
    }

    #[test]
    fn test_stream_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("staged");
        fs::write(&path, b"archive-bytes").unwrap();
        let mut out = Vec::new();
        assert_eq!(stream_file(&path, &mut out).unwrap(), 13);
        assert_eq!(out, b"archive-bytes");
    }
}
