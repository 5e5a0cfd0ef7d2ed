//! # arcshim Process Execution (`common::process`)
//!
//! File: cli/src/common/process.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! Everything arcshim needs from the operating system's process facility:
//!
//! - **`Streams`**: the caller's stdin/stdout/stderr, owned and sendable so they
//!   can follow an operation into a deferred closure or a pump thread.
//! - **`HostLocator`**: finds a host binary on the configured search path and
//!   refuses to return arcshim itself (self-recursion guard).
//! - **`run_to_completion`**: runs a host command synchronously, pumping its
//!   output into arbitrary writers. Used by the execution engine.
//! - **`spawn_host`** and **`Process`**: start a command and hand back a handle
//!   that is resolved later through `Process::wait`.
//!
//! ## Architecture
//!
//! `Process` is either a spawned child (`Process::Host`) or an in-process routine
//! that has not run yet (`Process::Deferred`). Both are consumed by `wait`, which
//! returns a `Completion` carrying the exit code and the error, if any. Output of
//! a spawned child is copied by one thread per stream; the threads are joined in
//! `wait`, so no output is lost when the caller reads the exit code.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use arcshim::common::process::{self, Streams};
//! use std::path::Path;
//!
//! # fn main() -> arcshim::core::error::Result<()> {
//! let handle = process::spawn_host(Path::new("/bin/ls"), &["-l".to_string()], Streams::inherit(), false, &[])?;
//! let completion = handle.wait();
//! assert_eq!(completion.code, 0);
//! # Ok(())
//! # }
//! ```
//!
use crate::core::config::HostConfig;
use crate::core::error::{Result, ShimError};
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// The standard streams an operation reads from and writes to.
pub struct Streams {
    pub stdin: Box<dyn Read + Send>,
    pub stdout: Box<dyn Write + Send>,
    pub stderr: Box<dyn Write + Send>,
    inherited: bool,
}

impl Streams {
    pub fn new(
        stdin: Box<dyn Read + Send>,
        stdout: Box<dyn Write + Send>,
        stderr: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
            inherited: false,
        }
    }

    /// The current process's own standard streams.
    pub fn inherit() -> Self {
        Self {
            stdin: Box::new(io::stdin()),
            stdout: Box::new(io::stdout()),
            stderr: Box::new(io::stderr()),
            inherited: true,
        }
    }

    /// True when these are the process's own streams, which children can share
    /// directly instead of being pumped.
    pub fn is_inherited(&self) -> bool {
        self.inherited
    }
}

impl fmt::Debug for Streams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streams")
            .field("inherited", &self.inherited)
            .finish_non_exhaustive()
    }
}

/// Outcome of a finished operation.
#[derive(Debug)]
pub struct Completion {
    /// `0` on success. A child's exit code, `128 + signal` for a child killed by
    /// a signal, or `1` for failed in-process work.
    pub code: i32,
    pub error: Option<anyhow::Error>,
}

impl Completion {
    fn success() -> Self {
        Self {
            code: 0,
            error: None,
        }
    }

    fn failure(code: i32, error: anyhow::Error) -> Self {
        Self {
            code: if code == 0 { 1 } else { code },
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// A spawned host command and the threads copying its output.
pub struct HostProcess {
    child: Child,
    command: String,
    pumps: Vec<JoinHandle<io::Result<u64>>>,
}

impl HostProcess {
    fn wait(mut self) -> Completion {
        let status = self.child.wait();
        for pump in self.pumps {
            match pump.join() {
                Ok(Ok(bytes)) => debug!("Pumped {} bytes from '{}'", bytes, self.command),
                Ok(Err(e)) => warn!("Lost output of '{}': {}", self.command, e),
                Err(_) => warn!("Output pump for '{}' panicked", self.command),
            }
        }
        match status {
            Ok(status) if status.success() => Completion::success(),
            Ok(status) => Completion::failure(
                exit_code(status),
                ShimError::HostExit {
                    cmd: self.command,
                    status: status.to_string(),
                }
                .into(),
            ),
            Err(e) => Completion::failure(
                1,
                anyhow::Error::new(e).context(format!("Failed to wait for '{}'", self.command)),
            ),
        }
    }
}

/// Deferred in-process work.
pub type Job = Box<dyn FnOnce() -> Result<()> + Send>;

/// # In-flight Operation (`Process`)
///
/// Handle returned by the dispatcher once a command line has been accepted.
/// Consumed exactly once by `wait`.
pub enum Process {
    Host(HostProcess),
    Deferred(Job),
}

impl Process {
    /// Terminal resize notification. Neither variant has a terminal to resize.
    pub fn resize(&self, cols: u16, rows: u16) {
        debug!("Ignoring resize to {}x{}", cols, rows);
    }

    /// Blocks until the operation is finished.
    pub fn wait(self) -> Completion {
        match self {
            Process::Host(host) => host.wait(),
            Process::Deferred(job) => match job() {
                Ok(()) => Completion::success(),
                Err(e) => Completion::failure(1, e),
            },
        }
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Process::Host(host) => f
                .debug_struct("Host")
                .field("command", &host.command)
                .field("pid", &host.child.id())
                .finish(),
            Process::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Renders a command the way a shell user would type it, for diagnostics.
pub fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// # Host Binary Lookup (`HostLocator`)
///
/// Resolves program names against the configured extra directories followed by
/// `PATH`. A match that is the running arcshim executable itself is rejected so
/// a shim installed as `tar` never calls itself.
#[derive(Debug, Clone)]
pub struct HostLocator {
    extra_dirs: Vec<PathBuf>,
    path: Option<OsString>,
    enabled: bool,
    self_exe: Option<PathBuf>,
}

impl HostLocator {
    pub fn from_config(config: &HostConfig) -> Self {
        Self {
            extra_dirs: config.search_path.iter().map(PathBuf::from).collect(),
            path: env::var_os("PATH"),
            enabled: config.enabled,
            self_exe: env::current_exe().ok(),
        }
    }

    /// Replaces the `PATH` part of the search path.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Overrides the executable treated as "self" by the recursion guard.
    pub fn with_self_exe(mut self, exe: Option<PathBuf>) -> Self {
        self.self_exe = exe;
        self
    }

    /// Applies caller-supplied environment variables; a `PATH` among them
    /// replaces the inherited one.
    pub fn with_env(self, env: &[(String, String)]) -> Self {
        match env.iter().rev().find(|(key, _)| key == "PATH") {
            Some((_, path)) => self.with_search_path(path),
            None => self,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn search_path(&self) -> Option<OsString> {
        let mut dirs = self.extra_dirs.clone();
        if let Some(path) = &self.path {
            dirs.extend(env::split_paths(path));
        }
        env::join_paths(dirs).ok()
    }

    /// Finds the host binary for an intercepted `tool`, honoring `host.enabled`.
    ///
    /// ## Errors
    ///
    /// * `ShimError::HostUnavailable` if host binaries are disabled or none is found.
    /// * `ShimError::HostRecursion` if the match is arcshim itself.
    pub fn locate(&self, tool: &str) -> Result<PathBuf> {
        if !self.enabled {
            return Err(ShimError::HostUnavailable {
                tool: tool.to_string(),
                reason: "host binaries are disabled by configuration".to_string(),
            }
            .into());
        }
        self.resolve_program(tool)
    }

    /// Finds `program` on the search path regardless of `host.enabled`, applying
    /// the recursion guard. Programs containing a path separator are resolved
    /// against the current directory.
    pub fn resolve_program(&self, program: &str) -> Result<PathBuf> {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let found = which::which_in(program, self.search_path(), cwd).map_err(|e| {
            ShimError::HostUnavailable {
                tool: program.to_string(),
                reason: e.to_string(),
            }
        })?;

        if let Some(self_exe) = &self.self_exe {
            if same_file(self_exe, &found) {
                return Err(ShimError::HostRecursion {
                    tool: program.to_string(),
                    path: found.display().to_string(),
                }
                .into());
            }
        }
        debug!("Resolved '{}' to {}", program, found.display());
        Ok(found)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Where a host command's standard output goes.
pub enum OutputTarget<'a> {
    /// Connected directly; used to capture an archive into a staging file.
    File(File),
    /// Copied by a pump thread into the writer.
    Stream(&'a mut (dyn Write + Send)),
}

/// # Run Host Command (`run_to_completion`)
///
/// Runs `command` with the given stdin, sends its stdout to `stdout` and copies
/// its stderr into `stderr`, returning once the child has exited and all output
/// has been copied.
///
/// ## Errors
///
/// * `ShimError::HostUnavailable` if the command cannot be spawned.
/// * `ShimError::HostExit` if it exits unsuccessfully.
pub fn run_to_completion(
    mut command: Command,
    stdin: Stdio,
    stdout: OutputTarget<'_>,
    stderr: &mut (dyn Write + Send),
) -> Result<()> {
    let description = describe(&command);
    info!("Running host command: {}", description);

    command.stdin(stdin).stderr(Stdio::piped());
    let out_writer = match stdout {
        OutputTarget::File(file) => {
            command.stdout(file);
            None
        }
        OutputTarget::Stream(writer) => {
            command.stdout(Stdio::piped());
            Some(writer)
        }
    };

    let mut child = command.spawn().map_err(|e| ShimError::HostUnavailable {
        tool: command.get_program().to_string_lossy().into_owned(),
        reason: format!("failed to spawn: {}", e),
    })?;
    let child_out = child.stdout.take();
    let child_err = child.stderr.take();

    let status = thread::scope(|scope| {
        let out_pump = match (child_out, out_writer) {
            (Some(mut from), Some(to)) => Some(scope.spawn(move || -> io::Result<u64> {
                let copied = io::copy(&mut from, &mut *to)?;
                to.flush()?;
                Ok(copied)
            })),
            _ => None,
        };
        let err_pump = child_err.map(|mut from| {
            scope.spawn(move || -> io::Result<u64> {
                let copied = io::copy(&mut from, &mut *stderr)?;
                stderr.flush()?;
                Ok(copied)
            })
        });

        let status = child.wait();
        for pump in [out_pump, err_pump].into_iter().flatten() {
            match pump.join() {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Lost output of '{}': {}", description, e),
                Err(_) => warn!("Output pump for '{}' panicked", description),
            }
        }
        status
    });

    let status = status.map_err(|e| ShimError::HostUnavailable {
        tool: command.get_program().to_string_lossy().into_owned(),
        reason: format!("failed to wait: {}", e),
    })?;
    if !status.success() {
        return Err(ShimError::HostExit {
            cmd: description,
            status: status.to_string(),
        }
        .into());
    }
    debug!("Host command succeeded: {}", description);
    Ok(())
}

fn pump<R, W>(mut from: R, mut to: W) -> JoinHandle<io::Result<u64>>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    thread::spawn(move || {
        let copied = io::copy(&mut from, &mut to)?;
        to.flush()?;
        Ok(copied)
    })
}

/// # Start Host Command (`spawn_host`)
///
/// Starts `program` with `args` and the caller's `streams`, returning as soon as
/// the child is running.
///
/// Inherited streams (and any `tty` request) are handed to the child directly,
/// so it sees the real terminal. Other streams are copied by threads: stdout and
/// stderr pumps are joined in `Process::wait`; the stdin pump is detached because
/// a child may exit without draining its input.
pub fn spawn_host(
    program: &Path,
    args: &[String],
    streams: Streams,
    tty: bool,
    env: &[(String, String)],
) -> Result<Process> {
    let mut command = Command::new(program);
    command
        .args(args)
        .envs(env.iter().map(|(key, value)| (key, value)));
    let description = describe(&command);
    let spawn_error = |e: io::Error| ShimError::HostUnavailable {
        tool: program.display().to_string(),
        reason: format!("failed to spawn: {}", e),
    };

    if tty || streams.is_inherited() {
        info!("Running host command with inherited stdio: {}", description);
        let child = command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(spawn_error)?;
        return Ok(Process::Host(HostProcess {
            child,
            command: description,
            pumps: Vec::new(),
        }));
    }

    info!("Running host command: {}", description);
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_error)?;

    let Streams {
        stdin,
        stdout,
        stderr,
        ..
    } = streams;
    if let Some(child_in) = child.stdin.take() {
        // Detached; the child closing its end ends the copy with a broken pipe.
        drop(pump(stdin, child_in));
    }
    let mut pumps = Vec::new();
    if let Some(child_out) = child.stdout.take() {
        pumps.push(pump(child_out, stdout));
    }
    if let Some(child_err) = child.stderr.take() {
        pumps.push(pump(child_err, stderr));
    }

    Ok(Process::Host(HostProcess {
        child,
        command: description,
        pumps,
    }))
}
