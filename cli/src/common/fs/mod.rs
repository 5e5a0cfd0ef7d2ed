//! # arcshim Filesystem Utilities Module (`common::fs`)
//!
//! File: cli/src/common/fs/mod.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!

//! ## Overview
//!
//! Filesystem helpers shared by the execution engine and the embedded archive
//! engine.
//!
//! - **`io`**: directory creation, partial-tolerant stream copies for stdin
//!   staging, and streaming staged files to a writer.
//! - **`paths`**: archive entry naming and path-traversal checks for extraction.
//!
//! ```rust
//! use arcshim::common::fs::{io, paths};
//! use std::path::Path;
//!
//! # fn run_example() -> arcshim::core::error::Result<()> {
//! io::ensure_dir_exists(Path::new("./out"))?;
//! let safe = paths::enclosed(Path::new("./docs/readme.md"))?;
//! assert_eq!(safe, Path::new("docs/readme.md"));
//! # Ok(())
//! # }
//! ```
//!

/// Basic file and stream I/O.
pub mod io;
/// Entry naming and traversal checks.
pub mod paths;
