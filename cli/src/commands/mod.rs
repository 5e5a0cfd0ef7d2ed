//! # arcshim Command Modules
//!
//! File: cli/src/commands/mod.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! The subcommands of the `arcshim` binary. Each module defines its `clap`
//! arguments struct and a `handle_*` function called from `main.rs`.
//!
//! - `run`: dispatch a command line (also used in multi-call mode)
//! - `detect`: identify an archive's format
//! - `list`: show the intercepted commands (`arcshim commands`)
//!

/// Dispatches a command line through the shim. Also backs multi-call mode.
pub mod run;
/// Content-based archive format detection.
pub mod detect;
/// Lists intercepted commands and their host binaries.
pub mod list;
