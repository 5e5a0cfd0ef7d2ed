//! # arcshim Dispatcher (`shim::dispatcher`)
//!
//! File: cli/src/shim/dispatcher.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! Entry point for every command line arcshim is asked to run. The dispatcher
//! decides between three outcomes:
//!
//! 1. **Intercept**: the base name is registered and its resolver accepts the
//!    arguments. The returned `Process` runs the execution engine on `wait`.
//! 2. **Run directly**: the command is not registered, or its resolver rejected
//!    the arguments, and `try_only` is off. The command is started on the host
//!    as-is with the caller's streams, environment and TTY request.
//! 3. **Refuse**: empty command lines, and with `try_only` set, anything that
//!    cannot be intercepted. Resolver errors are returned unchanged.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use arcshim::common::process::Streams;
//! use arcshim::core::config::Config;
//! use arcshim::shim::{engine::ExecContext, Dispatcher, Registry};
//!
//! # fn main() -> arcshim::core::error::Result<()> {
//! let registry = Registry::with_defaults();
//! let dispatcher = Dispatcher::new(&registry, ExecContext::from_config(&Config::default()));
//! let command_line: Vec<String> = vec!["tar".into(), "xzf".into(), "site.tgz".into()];
//! let process = dispatcher.run(Streams::inherit(), &command_line, false, &[], true)?;
//! let completion = process.wait();
//! std::process::exit(completion.code);
//! # }
//! ```
//!
use super::engine::{self, ExecContext};
use super::registry::Registry;
use crate::common::process::{self, Process, Streams};
use crate::core::error::{Result, ShimError};
use std::env::consts::EXE_SUFFIX;
use std::path::Path;
use tracing::{debug, info, warn};

/// Base name of `program` without directory or executable suffix.
pub fn base_name(program: &str) -> &str {
    let name = Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(program);
    if EXE_SUFFIX.is_empty() {
        name
    } else {
        name.strip_suffix(EXE_SUFFIX).unwrap_or(name)
    }
}

pub struct Dispatcher<'a> {
    registry: &'a Registry,
    ctx: ExecContext,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a Registry, ctx: ExecContext) -> Self {
        Self { registry, ctx }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// # Dispatch Command Line (`run`)
    ///
    /// Validates and starts `command_line` (program name first).
    ///
    /// ## Arguments
    ///
    /// * `streams` - Caller's stdin/stdout/stderr, moved into the operation.
    /// * `command_line` - Program name or path followed by its arguments.
    /// * `tty` - Whether the caller wants a terminal (direct host runs only).
    /// * `env` - Extra environment variables for any host process.
    /// * `try_only` - Never fall through to running the command unintercepted.
    ///
    /// ## Returns
    ///
    /// * `Result<Process>` - A handle to `wait` on. Intercepted work does not
    ///   start until then.
    ///
    /// ## Errors
    ///
    /// * `ShimError::NotSupported` for an empty command line, or an unregistered
    ///   command when `try_only` is set.
    /// * The resolver's error (`Parse`, `NotSupported`) when `try_only` is set.
    /// * `ShimError::HostUnavailable` / `HostRecursion` if a direct run cannot
    ///   find a host binary, or would only find arcshim itself.
    pub fn run(
        &self,
        streams: Streams,
        command_line: &[String],
        tty: bool,
        env: &[(String, String)],
        try_only: bool,
    ) -> Result<Process> {
        let Some((program, args)) = command_line.split_first() else {
            return Err(ShimError::NotSupported("empty command line".to_string()).into());
        };
        let tool = base_name(program);

        match self.registry.lookup(tool) {
            Some(family) => match family.resolve(tool, args) {
                Ok(invocation) => {
                    info!("Intercepted '{}' ({} family)", tool, family);
                    debug!("Normalized options: {:?}", invocation);
                    let ctx = self.ctx.clone().with_env(env);
                    let mut streams = streams;
                    return Ok(Process::Deferred(Box::new(move || {
                        engine::execute(&invocation, &mut streams, &ctx)
                    })));
                }
                Err(e) if try_only => {
                    debug!("'{}' rejected with try_only set: {}", tool, e);
                    return Err(e);
                }
                Err(e) => warn!("Not intercepting '{}' ({}); running it on the host", tool, e),
            },
            None if try_only => {
                return Err(ShimError::NotSupported(format!(
                    "'{}' is not an intercepted command",
                    tool
                ))
                .into());
            }
            None => debug!("'{}' is not registered; running it on the host", tool),
        }

        let host = self.ctx.host.clone().with_env(env).resolve_program(program)?;
        process::spawn_host(&host, args, streams, tty, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Config, HostConfig};
    use std::io;
    use tempfile::tempdir;

    fn line(parts: &str) -> Vec<String> {
        parts.split_whitespace().map(String::from).collect()
    }

    fn quiet_streams() -> Streams {
        Streams::new(
            Box::new(io::empty()),
            Box::new(io::sink()),
            Box::new(io::sink()),
        )
    }

    fn context(search_path: &Path) -> ExecContext {
        let mut ctx = ExecContext::from_config(&Config {
            host: HostConfig {
                enabled: false,
                search_path: Vec::new(),
            },
            ..Config::default()
        });
        ctx.host = ctx
            .host
            .with_search_path(search_path.as_os_str())
            .with_self_exe(None);
        ctx
    }

    fn shim_error(err: anyhow::Error) -> ShimError {
        match err.downcast::<ShimError>() {
            Ok(shim) => shim,
            Err(other) => panic!("unexpected error type: {:?}", other),
        }
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/usr/bin/tar"), "tar");
        assert_eq!(base_name("unzip"), "unzip");
    }

    #[test]
    fn test_empty_command_line_is_rejected() {
        let registry = Registry::with_defaults();
        let empty = tempdir().unwrap();
        let dispatcher = Dispatcher::new(&registry, context(empty.path()));
        let err = dispatcher
            .run(quiet_streams(), &[], false, &[], false)
            .unwrap_err();
        assert!(matches!(shim_error(err), ShimError::NotSupported(_)));
    }

    #[test]
    fn test_try_only_surfaces_resolver_errors() {
        let registry = Registry::with_defaults();
        let empty = tempdir().unwrap();
        let dispatcher = Dispatcher::new(&registry, context(empty.path()));

        let err = dispatcher
            .run(quiet_streams(), &line("tar -f a.tar"), false, &[], true)
            .unwrap_err();
        assert!(matches!(shim_error(err), ShimError::NotSupported(_)));

        let err = dispatcher
            .run(quiet_streams(), &line("tar -xqf a.tar"), false, &[], true)
            .unwrap_err();
        assert!(matches!(shim_error(err), ShimError::Parse(_)));

        let err = dispatcher
            .run(quiet_streams(), &line("gzip -d a.gz"), false, &[], true)
            .unwrap_err();
        assert!(matches!(shim_error(err), ShimError::NotSupported(_)));
    }

    #[test]
    fn test_accepted_command_is_deferred() {
        let registry = Registry::with_defaults();
        let empty = tempdir().unwrap();
        let dispatcher = Dispatcher::new(&registry, context(empty.path()));
        let process = dispatcher
            .run(quiet_streams(), &line("/bin/tar -xf missing.tar"), false, &[], true)
            .unwrap();
        assert!(matches!(process, Process::Deferred(_)));
        // Nothing ran yet; the missing archive only shows up in wait.
        let completion = process.wait();
        assert_eq!(completion.code, 1);
    }

    #[test]
    fn test_fallthrough_without_host_binary() {
        let registry = Registry::with_defaults();
        let empty = tempdir().unwrap();
        let dispatcher = Dispatcher::new(&registry, context(empty.path()));
        let err = dispatcher
            .run(quiet_streams(), &line("gzip -d a.gz"), false, &[], false)
            .unwrap_err();
        assert!(matches!(shim_error(err), ShimError::HostUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_rejected_command_runs_on_host() {
        use std::os::unix::fs::PermissionsExt;
        let bin = tempdir().unwrap();
        let script = bin.path().join("tar");
        std::fs::write(&script, "#!/bin/sh\nexit 7\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let registry = Registry::with_defaults();
        let dispatcher = Dispatcher::new(&registry, context(bin.path()));
        // -t (list) is not intercepted, so the host tar gets the command line.
        let process = dispatcher
            .run(quiet_streams(), &line("tar -tf a.tar"), false, &[], false)
            .unwrap();
        assert!(matches!(process, Process::Host(_)));
        assert_eq!(process.wait().code, 7);
    }
}
