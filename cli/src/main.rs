//! # arcshim Main Entry Point
//!
//! File: cli/src/main.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! This file serves as the main entry point for the arcshim CLI application.
//! It handles:
//! - Multi-call detection (the binary installed or symlinked as `tar`, ...)
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to the command handlers and turning their outcome into
//!   an exit code
//!
//! ## Examples
//!
//! ```bash
//! # Intercept a command explicitly
//! arcshim -v run -- tar czf - src > src.tgz
//!
//! # Multi-call mode
//! ln -s "$(command -v arcshim)" ~/bin/tar
//! tar xzf src.tgz -C out
//! ```
//!
//! Exit codes: the completed command's code, `2` for command lines arcshim
//! rejects (parse errors, unsupported flag combinations) and `1` for any other
//! failure.
//!
use arcshim::commands;
use arcshim::common::process::Completion;
use arcshim::core::error::{Result, ShimError};
use arcshim::shim::{dispatcher::base_name, Registry};
use clap::Parser;
use std::ffi::OsString;
use tracing_subscriber::{fmt, EnvFilter};

/// Defines the top-level command-line arguments structure using Clap's derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "arcshim",
    about = "arcshim: tar/zip/unzip/unrar with an embedded fallback engine",
    long_about = "Runs archive commands with the host binary when it works and with a built-in \n\
                  archive engine when it does not. Install it as `tar`, `zip`, `unzip` or `unrar` \n\
                  to intercept those commands directly.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Parser, Debug)]
enum Commands {
    #[command(alias = "r")]
    Run(commands::run::RunArgs),
    Detect(commands::detect::DetectArgs),
    #[command(name = "commands", alias = "ls")]
    List(commands::list::ListArgs),
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ShimError>() {
        Some(ShimError::Parse(_)) | Some(ShimError::NotSupported(_)) => 2,
        _ => 1,
    }
}

fn report(err: &anyhow::Error) {
    tracing::error!("Command execution failed: {:?}", err);
    eprintln!("Error: {}", err);
}

/// Exits with the outcome of a dispatched command line. A failing host command
/// has already spoken on stderr, so only its exit code is passed on.
fn finish(result: Result<Completion>) -> ! {
    match result {
        Ok(completion) => {
            if let Some(err) = &completion.error {
                if !matches!(
                    err.downcast_ref::<ShimError>(),
                    Some(ShimError::HostExit { .. })
                ) {
                    report(err);
                }
            }
            std::process::exit(completion.code)
        }
        Err(err) => {
            report(&err);
            std::process::exit(exit_code_for(&err))
        }
    }
}

/// Command lines are handled as UTF-8. Other arguments are refused rather than
/// rewritten, since a lossy path would name a different file.
fn utf8_args(args: impl IntoIterator<Item = OsString>) -> Result<Vec<String>> {
    args.into_iter()
        .map(|arg| {
            arg.into_string().map_err(|raw| {
                anyhow::Error::from(ShimError::NotSupported(format!(
                    "argument is not valid UTF-8: {:?}",
                    raw
                )))
            })
        })
        .collect()
}

fn main() {
    let argv = match utf8_args(std::env::args_os()) {
        Ok(argv) => argv,
        Err(e) => {
            report(&e);
            std::process::exit(exit_code_for(&e));
        }
    };
    let registry = Registry::with_defaults();

    let invoked_as = argv.first().map(|arg0| base_name(arg0)).unwrap_or("arcshim");
    if registry.lookup(invoked_as).is_some() {
        init_logging(0);
        tracing::debug!("Multi-call invocation as '{}': {:?}", invoked_as, argv);
        finish(commands::run::dispatch(&registry, &argv, false, &[], false));
    }

    let cli = Cli::parse_from(&argv);
    init_logging(cli.verbose);
    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let command_result = match cli.command {
        Commands::Run(args) => finish(commands::run::handle_run(args, &registry)),
        Commands::Detect(args) => commands::detect::handle_detect(args),
        Commands::List(args) => commands::list::handle_list(args, &registry),
    };

    if let Err(e) = command_result {
        report(&e);
        std::process::exit(exit_code_for(&e));
    }
}
