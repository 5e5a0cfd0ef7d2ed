//! # arcshim Execution Engine (`shim::engine`)
//!
//! File: cli/src/shim/engine.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! Carries out an `Invocation`: first with the host binary, then, if that is
//! missing or fails, with the embedded archive engine.
//!
//! ## Architecture
//!
//! Extraction:
//! 1. Make sure the target directory exists.
//! 2. If the archive is `-`, copy stdin into `.arcshim-stdin-*` inside the
//!    target directory. The host binary and the embedded engine both read that
//!    file, so a host that dies halfway does not lose the input.
//! 3. Run the host binary on the archive path.
//! 4. On host failure, print a notice, detect the format from content (falling
//!    back to the format the command line implies) and unpack it.
//! 5. Delete the staged input on success. On failure keep it and print its path.
//!
//! Creation:
//! 1. To a path: run the host binary, fall back to building the archive at
//!    that path.
//! 2. To `-`: capture the host's stdout into `.arcshim-out-*` and stream it out
//!    only once the host succeeded. Otherwise build into `.arcshim-build-*` and
//!    stream that. Both files are removed when they go out of scope.
//!
//! Host failures are the only recoverable errors; everything else ends the
//! operation. Notices are written to the caller's stderr before any error is
//! returned.
//!
use super::{ArchiveTarget, Invocation, Mode};
use crate::common::archive::{self, CreateRequest};
use crate::common::fs::io;
use crate::common::process::{self, HostLocator, OutputTarget, Streams};
use crate::core::config::Config;
use crate::core::error::{Result, ShimError};
use anyhow::Context;
use std::ffi::OsStr;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const STDIN_PREFIX: &str = ".arcshim-stdin-";
const CAPTURE_PREFIX: &str = ".arcshim-out-";
const BUILD_PREFIX: &str = ".arcshim-build-";

/// Settings shared by every invocation in one process.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub host: HostLocator,
    /// Directory for stdout staging files; `None` uses the system temp dir.
    pub staging_dir: Option<PathBuf>,
    /// Extra environment for host commands.
    pub env: Vec<(String, String)>,
}

impl ExecContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: HostLocator::from_config(&config.host),
            staging_dir: config.staging.temp_dir.as_ref().map(PathBuf::from),
            env: Vec::new(),
        }
    }

    pub fn with_env(mut self, env: &[(String, String)]) -> Self {
        self.host = self.host.with_env(env);
        self.env = env.to_vec();
        self
    }
}

/// Writes a user-facing notice to the caller's stderr. A broken stderr must not
/// fail the operation, so write errors are only logged.
fn notice(stderr: &mut dyn Write, message: &str) {
    if let Err(e) = writeln!(stderr, "arcshim: {}", message).and_then(|_| stderr.flush()) {
        warn!("Could not write notice to stderr: {}", e);
    }
}

/// Announces the switch to the embedded engine, or returns `err` if it is not
/// a host failure.
fn fall_back(invocation: &Invocation, err: anyhow::Error, stderr: &mut dyn Write) -> Result<()> {
    let recoverable = err
        .downcast_ref::<ShimError>()
        .is_some_and(ShimError::is_recoverable);
    if !recoverable {
        return Err(err);
    }
    info!("Host {} failed, using the embedded engine: {}", invocation.tool(), err);
    notice(
        stderr,
        &format!("{}; using the embedded {} engine", err, invocation.tool()),
    );
    let ignored = invocation.ignored_flags();
    if !ignored.is_empty() {
        notice(
            stderr,
            &format!(
                "the embedded {} engine ignores {}",
                invocation.tool(),
                ignored.join(", ")
            ),
        );
    }
    Ok(())
}

/// Runs the host binary for `invocation` with `archive_arg` as the archive
/// operand. Its stdout goes to `capture` when given, else to the caller.
fn run_host(
    invocation: &Invocation,
    archive_arg: &OsStr,
    capture: Option<File>,
    streams: &mut Streams,
    ctx: &ExecContext,
) -> Result<()> {
    let program = ctx.host.locate(invocation.tool())?;
    let mut command = Command::new(&program);
    command
        .args(invocation.host_args(archive_arg))
        .envs(ctx.env.iter().map(|(key, value)| (key, value)));
    let stdout = match capture {
        Some(file) => OutputTarget::File(file),
        None => OutputTarget::Stream(&mut *streams.stdout),
    };
    process::run_to_completion(command, Stdio::null(), stdout, &mut *streams.stderr)
}

fn staging_file(ctx: &ExecContext, prefix: &str) -> Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix);
    let file = match &ctx.staging_dir {
        Some(dir) => {
            io::ensure_dir_exists(dir)?;
            builder.tempfile_in(dir)
        }
        None => builder.tempfile(),
    };
    file.context("Failed to create staging file")
}

/// Persists `staged` and reports where it went.
fn keep_staged(staged: NamedTempFile, stderr: &mut dyn Write) {
    match staged.keep() {
        Ok((_, path)) => {
            warn!("Keeping staged input at {}", path.display());
            notice(stderr, &format!("staged input kept at {}", path.display()));
        }
        Err(e) => warn!("Failed to keep staged input: {}", e),
    }
}

/// Copies stdin into a fresh file in `dir`.
fn stage_stdin(streams: &mut Streams, dir: &Path) -> Result<NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .prefix(STDIN_PREFIX)
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create staging file in {}", dir.display()))?;
    let copy = io::copy_partial(&mut *streams.stdin, staged.as_file_mut())?;

    match copy.error {
        Some(e) if copy.bytes == 0 => {
            keep_staged(staged, &mut *streams.stderr);
            Err(anyhow::Error::new(e).context("Failed to read archive from stdin"))
        }
        Some(e) => {
            warn!(
                "Reading stdin failed after {} bytes ({}); continuing with the data received",
                copy.bytes, e
            );
            Ok(staged)
        }
        None => {
            debug!("Staged {} bytes of stdin at {}", copy.bytes, staged.path().display());
            Ok(staged)
        }
    }
}

fn extract(invocation: &Invocation, streams: &mut Streams, ctx: &ExecContext) -> Result<()> {
    let target = invocation.directory().unwrap_or(Path::new("."));
    io::ensure_dir_exists(target)?;
    let target = target
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", target.display()))?;

    let (source, staged) = match invocation.archive() {
        ArchiveTarget::Stdio => {
            let staged = stage_stdin(streams, &target)?;
            (staged.path().to_path_buf(), Some(staged))
        }
        ArchiveTarget::Path(path) => (path.clone(), None),
    };

    let result = extract_from(invocation, &source, &target, streams, ctx);
    if let Some(staged) = staged {
        if result.is_err() {
            keep_staged(staged, &mut *streams.stderr);
        }
    }
    result
}

fn extract_from(
    invocation: &Invocation,
    source: &Path,
    target: &Path,
    streams: &mut Streams,
    ctx: &ExecContext,
) -> Result<()> {
    match run_host(invocation, source.as_os_str(), None, streams, ctx) {
        Ok(()) => return Ok(()),
        Err(e) => fall_back(invocation, e, &mut *streams.stderr)?,
    }

    let format = match archive::detect(source)? {
        Some(format) => format,
        None => {
            let implied = invocation.archive_format();
            debug!(
                "No signature found in {}; assuming {}",
                source.display(),
                implied
            );
            implied
        }
    };
    archive::unarchive(format, source, target)
}

fn create(invocation: &Invocation, streams: &mut Streams, ctx: &ExecContext) -> Result<()> {
    let base_dir = invocation.directory().unwrap_or(Path::new("."));
    let request = CreateRequest::new(base_dir, invocation.sources())
        .with_zip_settings(invocation.zip_settings());
    let format = invocation.archive_format();

    match invocation.archive() {
        ArchiveTarget::Path(dest) => {
            match run_host(invocation, dest.as_os_str(), None, streams, ctx) {
                Ok(()) => return Ok(()),
                Err(e) => fall_back(invocation, e, &mut *streams.stderr)?,
            }
            archive::archive(format, &request, dest)
        }
        ArchiveTarget::Stdio => {
            {
                let captured = staging_file(ctx, CAPTURE_PREFIX)?;
                let capture = captured
                    .as_file()
                    .try_clone()
                    .context("Failed to open capture file")?;
                match run_host(invocation, OsStr::new("-"), Some(capture), streams, ctx) {
                    Ok(()) => {
                        io::stream_file(captured.path(), &mut *streams.stdout)?;
                        return Ok(());
                    }
                    Err(e) => fall_back(invocation, e, &mut *streams.stderr)?,
                }
            }

            let built = staging_file(ctx, BUILD_PREFIX)?;
            archive::archive(format, &request, built.path())?;
            io::stream_file(built.path(), &mut *streams.stdout)?;
            Ok(())
        }
    }
}

/// # Execute Invocation (`execute`)
///
/// Performs `invocation` against the caller's `streams`. Runs inside
/// `Process::wait` for intercepted commands.
///
/// ## Errors
///
/// Returns the embedded engine's error when both the host binary and the
/// fallback fail, or the first non-recoverable error (I/O, unsupported format).
pub fn execute(invocation: &Invocation, streams: &mut Streams, ctx: &ExecContext) -> Result<()> {
    debug!("Executing {:?}", invocation);
    match invocation.mode() {
        Mode::Extract => extract(invocation, streams, ctx),
        Mode::Create => create(invocation, streams, ctx),
    }
}
