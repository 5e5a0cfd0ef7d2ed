//! # arcshim Error Types
//!
//! File: cli/src/core/error.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! This module defines the error taxonomy used throughout arcshim. Errors fall
//! into three groups that drive control flow:
//!
//! - **Terminal, before execution**: `NotSupported` and `Parse`. The requested
//!   command line is outside what arcshim promises to handle.
//! - **Recoverable**: `HostUnavailable`, `HostRecursion` and `HostExit`. The host
//!   binary could not do the work; the execution engine falls back to the
//!   embedded archive engine.
//! - **Terminal, during execution**: `UnsupportedFormat`, `FormatDetection`,
//!   `FileSystem` and plain I/O errors wrapped with `anyhow` context.
//!
//! ## Architecture
//!
//! - `ShimError`: a `thiserror` enum carrying the specific failure kinds.
//! - `Result<T>`: alias for `anyhow::Result<T>` so call sites can attach context.
//!
//! Callers classify an `anyhow::Error` by downcasting:
//!
//! ```rust
//! # use arcshim::core::error::ShimError;
//! # fn classify(err: &anyhow::Error) -> bool {
//! matches!(
//!     err.downcast_ref::<ShimError>(),
//!     Some(ShimError::NotSupported(_))
//! )
//! # }
//! ```
//!
use thiserror::Error;

/// Custom error type for arcshim.
#[derive(Error, Debug)]
pub enum ShimError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Filesystem error: {0}")]
    FileSystem(String),

    /// The command or flag combination is outside the supported subset.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Malformed flags, carrying the rendered parser message.
    #[error("Argument parsing error: {0}")]
    Parse(String),

    #[error("Host binary '{tool}' is unavailable: {reason}")]
    HostUnavailable { tool: String, reason: String },

    #[error("Host binary '{tool}' resolves to this executable ({path}); refusing to recurse")]
    HostRecursion { tool: String, path: String },

    #[error("Host command failed: {cmd}, Status: {status}")]
    HostExit { cmd: String, status: String },

    #[error("Archive format '{format}' is not supported by the embedded engine")]
    UnsupportedFormat { format: String },

    #[error("Unable to detect archive format: {0}")]
    FormatDetection(String),
}

impl ShimError {
    /// Host failures are the only errors that trigger the embedded fallback.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ShimError::HostUnavailable { .. }
                | ShimError::HostRecursion { .. }
                | ShimError::HostExit { .. }
        )
    }
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;
