//! # arcshim Run Command
//!
//! File: cli/src/commands/run.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! Implements `arcshim run`, which hands a command line to the dispatcher with
//! the process's own standard streams and waits for it. The same path is used
//! in multi-call mode, when the binary itself is installed as `tar`, `zip`,
//! `unzip` or `unrar`.
//!
//! ## Usage
//!
//! ```bash
//! # Extract a tarball from stdin, falling back to the embedded engine
//! cat site.tgz | arcshim run -- tar xzf - -C /srv/site
//!
//! # Only intercept; never run an unsupported command line on the host
//! arcshim run --try-only -- zip -r out.zip docs
//!
//! # Extra environment for host binaries
//! arcshim run -e LC_ALL=C -- unzip bundle.zip -d out
//! ```
//!
use crate::common::process::{Completion, Streams};
use crate::core::config;
use crate::core::error::Result;
use crate::shim::engine::ExecContext;
use crate::shim::{Dispatcher, Registry};
use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

/// # Run Arguments (`RunArgs`)
#[derive(Parser, Debug)]
#[command(
    about = "Run an archive command through arcshim",
    long_about = "Intercepts tar, zip, unzip and unrar command lines. The host binary is tried first; \
                  when it is missing or fails, the embedded archive engine does the work."
)]
pub struct RunArgs {
    /// Fail instead of running commands arcshim cannot intercept.
    #[arg(long)]
    pub try_only: bool,

    /// Give a directly executed host command the terminal.
    #[arg(long)]
    pub tty: bool,

    /// Extra environment variable for host commands (repeatable).
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// The command line to run, e.g. `-- tar xzf site.tgz`.
    #[arg(required = true, last = true)]
    pub command: Vec<String>,
}

fn parse_env_pair(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

/// Loads configuration, dispatches `command_line` and waits for it.
///
/// ## Errors
///
/// Returns an `Err` when configuration cannot be loaded or the dispatcher
/// refuses the command line. Failures of the operation itself are reported in
/// the returned `Completion`.
pub fn dispatch(
    registry: &Registry,
    command_line: &[String],
    tty: bool,
    env: &[(String, String)],
    try_only: bool,
) -> Result<Completion> {
    let cfg = config::load_config().context("Failed to load arcshim configuration")?;
    let dispatcher = Dispatcher::new(registry, ExecContext::from_config(&cfg));
    let process = dispatcher.run(Streams::inherit(), command_line, tty, env, try_only)?;
    debug!("Waiting for {:?}", process);
    let completion = process.wait();
    info!("Command finished with code {}", completion.code);
    Ok(completion)
}

/// # Handle Run Command (`handle_run`)
pub fn handle_run(args: RunArgs, registry: &Registry) -> Result<Completion> {
    debug!("Run args: {:?}", args);
    dispatch(registry, &args.command, args.tty, &args.env, args.try_only)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_pair() {
        assert_eq!(
            parse_env_pair("LC_ALL=C"),
            Ok(("LC_ALL".to_string(), "C".to_string()))
        );
        assert_eq!(
            parse_env_pair("OPTS=a=b"),
            Ok(("OPTS".to_string(), "a=b".to_string()))
        );
        assert!(parse_env_pair("=value").is_err());
        assert!(parse_env_pair("NOVALUE").is_err());
    }

    #[test]
    fn test_run_args_parsing() {
        let args = RunArgs::try_parse_from([
            "run", "--try-only", "-e", "A=1", "-e", "B=2", "--", "tar", "-xf", "a.tar",
        ])
        .unwrap();
        assert!(args.try_only);
        assert!(!args.tty);
        assert_eq!(args.env.len(), 2);
        assert_eq!(args.command, vec!["tar", "-xf", "a.tar"]);
    }

    #[test]
    fn test_run_args_require_command() {
        assert!(RunArgs::try_parse_from(["run", "--tty"]).is_err());
    }
}
