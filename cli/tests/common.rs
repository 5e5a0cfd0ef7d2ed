//! # arcshim CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Every test runs
//! the real `arcshim` binary inside a `Sandbox`: a temp directory holding a
//! private `bin/` (the only directory on `PATH`), a staging directory, a work
//! directory used as the current directory, and a config file selected with
//! `ARCSHIM_CONFIG`. Fake host binaries are small shell scripts in `bin/`.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// # Get arcshim Command (`arcshim_cmd`)
///
/// Creates an `assert_cmd::Command` for the compiled `arcshim` binary.
///
/// ## Panics
/// Panics if the binary cannot be found via `Command::cargo_bin`.
pub fn arcshim_cmd() -> Command {
    Command::cargo_bin("arcshim").expect("Failed to find arcshim binary for testing")
}

/// Path of the compiled `arcshim` binary, for multi-call symlinks.
pub fn arcshim_path() -> PathBuf {
    assert_cmd::cargo::cargo_bin("arcshim")
}

pub struct Sandbox {
    pub root: TempDir,
}

impl Sandbox {
    /// Creates the directory layout and a config with host binaries enabled.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("Failed to create sandbox");
        for dir in ["bin", "staging", "work"] {
            fs::create_dir(root.path().join(dir)).expect("Failed to create sandbox dir");
        }
        let sandbox = Self { root };
        sandbox.write_config(true);
        sandbox
    }

    pub fn bin(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    pub fn staging(&self) -> PathBuf {
        self.root.path().join("staging")
    }

    pub fn work(&self) -> PathBuf {
        self.root.path().join("work")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.path().join("arcshim.toml")
    }

    pub fn write_config(&self, host_enabled: bool) {
        let config = format!(
            "[host]\nenabled = {}\n\n[staging]\ntemp_dir = \"{}\"\n",
            host_enabled,
            self.staging().display()
        );
        fs::write(self.config_path(), config).expect("Failed to write config");
    }

    /// Writes an executable `/bin/sh` script named `name` into `bin/`.
    #[cfg(unix)]
    pub fn fake_host(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = self.bin().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write fake host");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make fake host executable");
        path
    }

    /// `arcshim` with the sandbox's config, `PATH` and working directory.
    pub fn cmd(&self) -> Command {
        let mut cmd = arcshim_cmd();
        self.configure(&mut cmd);
        cmd
    }

    /// Applies the sandbox environment to any command (e.g. a multi-call symlink).
    pub fn configure(&self, cmd: &mut Command) {
        cmd.env("ARCSHIM_CONFIG", self.config_path())
            .env("PATH", self.bin())
            .env_remove("RUST_LOG")
            .current_dir(self.work());
    }

    /// Writes `contents` to `relative` under the work directory.
    pub fn write_work_file(&self, relative: &str, contents: &str) {
        let path = self.work().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(path, contents).expect("Failed to write work file");
    }

    pub fn staging_is_empty(&self) -> bool {
        dir_entries(&self.staging()).is_empty()
    }
}

/// Names of the entries directly inside `dir`, sorted.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to read dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
