//! # arcshim Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! Foundational components shared by the interception core, the embedded
//! archive engine and the CLI:
//! - `config`: Configuration loading, merging, and validation
//! - `error`: Error taxonomy (`ShimError`) and the `Result` alias
//!
//! ```rust
//! use arcshim::core::config; // For loading configuration
//! use arcshim::core::error::{Result, ShimError}; // For error handling
//! ```
//!
pub mod config;
pub mod error;
