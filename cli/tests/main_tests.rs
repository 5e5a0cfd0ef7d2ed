//! # arcshim CLI Main Integration Tests
//!
//! File: cli/tests/main_tests.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! Top-level behavior of the `arcshim` binary: standard flags, the `commands`
//! listing and `detect`.
//!

mod common;
use common::*;
use predicates::prelude::*;

#[test]
fn test_help_lists_subcommands() {
    arcshim_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("commands"));
}

#[test]
fn test_version_flag() {
    arcshim_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[cfg(unix)]
#[test]
fn test_commands_listing_shows_host_binaries() {
    let sandbox = Sandbox::new();
    let fake_tar = sandbox.fake_host("tar", "exit 0");

    sandbox
        .cmd()
        .arg("commands")
        .assert()
        .success()
        .stdout(predicate::str::contains(fake_tar.display().to_string()))
        .stdout(predicate::str::contains("unrar"))
        .stdout(predicate::str::contains("unzip"))
        .stdout(predicate::str::contains("embedded engine only"));
}

#[test]
fn test_detect_known_and_unknown_files() {
    let sandbox = Sandbox::new();
    sandbox.write_work_file("notes.txt", "just text");
    std::fs::write(
        sandbox.work().join("fake.zip"),
        b"PK\x03\x04 not really a full archive",
    )
    .unwrap();

    sandbox
        .cmd()
        .args(["detect", "fake.zip"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fake.zip: zip (embedded: extract yes, create yes)"));

    sandbox
        .cmd()
        .args(["detect", "notes.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no known archive signature"));
}

#[test]
fn test_invalid_config_is_reported() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.config_path(), "[host]\nunknown_key = 1\n").unwrap();
    sandbox
        .cmd()
        .args(["run", "--", "tar", "-cf", "-", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}

#[cfg(unix)]
#[test]
fn test_non_utf8_argument_is_refused() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["run", "--", "tar", "-cf", "out.tar"])
        .arg(OsStr::from_bytes(b"caf\xe9"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not valid UTF-8"));
    assert!(!sandbox.work().join("out.tar").exists());
}
