//! # arcshim Library Root
//!
//! File: cli/src/lib.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! arcshim intercepts `tar`, `zip`, `unzip` and `unrar` command lines and runs
//! them with the host binary, falling back to an embedded archive engine when
//! the host binary is missing or fails. The binary in `main.rs` is a thin layer
//! over the modules exported here.
//!

/// CLI subcommands (`run`, `detect`, `commands`).
pub mod commands;
/// Shared utilities: archive engine, filesystem helpers, processes.
pub mod common;
/// Core infrastructure: errors and configuration.
pub mod core;
/// Command interception: registry, dispatcher, resolvers, execution engine.
pub mod shim;
