//! # arcshim Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! Shared building blocks used by the shim layer and the CLI commands. Nothing
//! in here knows about command lines; it deals in archives, paths and processes.
//!
//! - **`archive`**: the embedded archive engine (tar, zip, rar and their
//!   compressions) plus content-based format detection.
//! - **`fs`**: filesystem helpers (directory creation, stream copies, archive
//!   entry path handling).
//! - **`process`**: host binary lookup, process spawning and the `Process`
//!   handle returned to callers.
//!
//! ## Usage
//!
//! ```rust
//! use arcshim::common::{archive, fs};
//! use std::path::Path;
//!
//! # fn main() -> arcshim::core::error::Result<()> {
//! # let temp_dir = tempfile::tempdir()?;
//! let out_dir = temp_dir.path().join("out");
//! fs::io::ensure_dir_exists(&out_dir)?;
//! assert_eq!(archive::format::sniff(b"PK\x03\x04"), Some(archive::format::ArchiveFormat::Zip));
//! # Ok(())
//! # }
//! ```
//!

/// Embedded archive engine and format detection.
pub mod archive;
/// Filesystem helpers (I/O, archive entry paths).
pub mod fs;
/// Host lookup, process spawning and the `Process` handle.
pub mod process;
