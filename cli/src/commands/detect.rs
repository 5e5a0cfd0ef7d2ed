//! # arcshim Detect Command
//!
//! File: cli/src/commands/detect.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! Implements `arcshim detect <file>`: prints the archive format found in the
//! file's contents and what the embedded engine can do with it.
//!
//! ```text
//! $ arcshim detect bundle.tar.zst
//! bundle.tar.zst: tar.zst (embedded: extract yes, create yes)
//! ```
//!
use crate::common::archive::{self, format::ArchiveFormat};
use crate::core::error::{Result, ShimError};
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(about = "Detect the archive format of a file from its contents")]
pub struct DetectArgs {
    /// File to inspect.
    pub file: PathBuf,
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// One-line description of `format` for display.
pub fn describe_format(format: ArchiveFormat) -> String {
    format!(
        "{} (embedded: extract {}, create {})",
        format,
        yes_no(format.can_extract()),
        yes_no(format.can_create())
    )
}

/// # Handle Detect Command (`handle_detect`)
///
/// ## Errors
///
/// Returns `ShimError::FormatDetection` if no known signature is found, and
/// I/O errors if the file cannot be read.
pub fn handle_detect(args: DetectArgs) -> Result<()> {
    debug!("Detect args: {:?}", args);
    match archive::detect(&args.file)? {
        Some(format) => {
            println!("{}: {}", args.file.display(), describe_format(format));
            Ok(())
        }
        None => Err(ShimError::FormatDetection(format!(
            "{}: no known archive signature",
            args.file.display()
        ))
        .into()),
    }
}
