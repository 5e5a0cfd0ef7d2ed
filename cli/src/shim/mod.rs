//! # arcshim Command Interception (`shim`)
//!
//! File: cli/src/shim/mod.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! The interception layer: it recognizes `tar`, `zip`, `unzip` and `unrar`
//! command lines, turns them into normalized options and carries them out with
//! the host binary or, failing that, the embedded archive engine.
//!
//! ## Architecture
//!
//! - **`registry`**: base name → `CommandFamily`, built once at startup.
//! - **`dispatcher`**: the `Dispatcher::run` entry point deciding between
//!   interception, a direct host run and rejection.
//! - **`tar`** / **`zip`**: per-family option resolvers producing an
//!   `Invocation`.
//! - **`engine`**: host attempt, embedded fallback and temp-file staging.
//!
//! ```text
//! command line ─► Dispatcher ─► resolver ─► Invocation ─► engine (in Process::wait)
//!                     │
//!                     └─► direct host run (not intercepted)
//! ```
//!
pub mod dispatcher;
pub mod engine;
pub mod registry;
pub mod tar;
pub mod zip;

pub use dispatcher::Dispatcher;
pub use registry::{CommandFamily, Registry};

use crate::common::archive::format::ArchiveFormat;
use crate::common::archive::zip::ZipSettings;
use crate::core::error::ShimError;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Whether an invocation builds or unpacks an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Extract,
}

/// The archive operand of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveTarget {
    /// `-`: standard input when extracting, standard output when creating.
    Stdio,
    Path(PathBuf),
}

impl ArchiveTarget {
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            ArchiveTarget::Stdio
        } else {
            ArchiveTarget::Path(PathBuf::from(arg))
        }
    }

    pub fn is_stdio(&self) -> bool {
        matches!(self, ArchiveTarget::Stdio)
    }
}

/// A validated, family-specific command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Tar(tar::TarOptions),
    Zip(zip::ZipOptions),
}

impl Invocation {
    /// Name of the host binary that performs this invocation.
    pub fn tool(&self) -> &'static str {
        match self {
            Invocation::Tar(_) => "tar",
            Invocation::Zip(options) => options.tool.name(),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Invocation::Tar(options) => options.mode,
            Invocation::Zip(options) => options.mode,
        }
    }

    pub fn archive(&self) -> &ArchiveTarget {
        match self {
            Invocation::Tar(options) => &options.archive,
            Invocation::Zip(options) => &options.archive,
        }
    }

    /// Extraction target, or the base directory sources are resolved against.
    pub fn directory(&self) -> Option<&Path> {
        match self {
            Invocation::Tar(options) => options.directory.as_deref(),
            Invocation::Zip(options) => options.directory.as_deref(),
        }
    }

    pub fn sources(&self) -> &[PathBuf] {
        match self {
            Invocation::Tar(options) => &options.sources,
            Invocation::Zip(options) => &options.sources,
        }
    }

    /// Arguments for the host binary, with `archive` in place of the archive
    /// operand (a staged file, or `-` for output captured from stdout).
    pub fn host_args(&self, archive: &OsStr) -> Vec<OsString> {
        match self {
            Invocation::Tar(options) => options.host_args(archive),
            Invocation::Zip(options) => options.host_args(archive),
        }
    }

    /// Flags the embedded engine cannot honor, as the user spelled them.
    pub fn ignored_flags(&self) -> Vec<&'static str> {
        match self {
            Invocation::Tar(options) => options.ignored_flags(),
            Invocation::Zip(_) => Vec::new(),
        }
    }

    /// Format the command line implies, used to build archives and as the
    /// fallback when content detection fails.
    pub fn archive_format(&self) -> ArchiveFormat {
        match self {
            Invocation::Tar(options) => ArchiveFormat::Tar(options.compression),
            Invocation::Zip(options) => options.tool.archive_format(),
        }
    }

    pub fn zip_settings(&self) -> ZipSettings {
        match self {
            Invocation::Tar(_) => ZipSettings::default(),
            Invocation::Zip(options) => options.settings(),
        }
    }
}

/// Converts a clap error into `ShimError::Parse`, keeping only the headline.
fn parse_error(tool: &str, err: clap::Error) -> anyhow::Error {
    let rendered = err.to_string();
    let headline = rendered
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default()
        .trim()
        .trim_start_matches("error: ");
    ShimError::Parse(format!("{}: {}", tool, headline)).into()
}

fn not_supported(message: impl Into<String>) -> anyhow::Error {
    ShimError::NotSupported(message.into()).into()
}
