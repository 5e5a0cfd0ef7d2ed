//! # arcshim `zip`/`unzip`/`unrar` Option Resolver (`shim::zip`)
//!
//! File: cli/src/shim/zip.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! One family for the three zip-like tools, since they share the same
//! normalized shape (one archive, one directory, a list of sources).
//!
//! - `zip [-r] [-q] [-Z store|deflate|bzip2] [-0..-9] [-O out.zip] [out.zip] paths...`
//!   Without `-O` the first path is the destination. `-0` means store.
//! - `unzip [-o] [-q] archive.zip [-d dir]`
//! - `unrar [x] archive.rar [dir]`
//!
//! Recursion (`zip`) and overwriting (`unzip`, `unrar`) are always on.
//!
use super::{not_supported, parse_error, ArchiveTarget, CommandFamily, Mode, Registry};
use crate::common::archive::format::ArchiveFormat;
use crate::common::archive::zip::{ZipMethod, ZipSettings};
use crate::core::error::Result;
use clap::Parser;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use tracing::debug;

/// Registers `zip`, `unzip` and `unrar`.
pub fn register(registry: &mut Registry) {
    for tool in [ZipTool::Zip, ZipTool::Unzip, ZipTool::Unrar] {
        registry.register(tool.name(), CommandFamily::Zip);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZipTool {
    Zip,
    Unzip,
    Unrar,
}

impl ZipTool {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "zip" => Some(Self::Zip),
            "unzip" => Some(Self::Unzip),
            "unrar" => Some(Self::Unrar),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Unzip => "unzip",
            Self::Unrar => "unrar",
        }
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        match self {
            Self::Zip | Self::Unzip => ArchiveFormat::Zip,
            Self::Unrar => ArchiveFormat::Rar,
        }
    }
}

/// Normalized command line of the zip family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipOptions {
    pub tool: ZipTool,
    pub mode: Mode,
    pub archive: ArchiveTarget,
    /// Extraction target (`unzip -d`, `unrar` second operand).
    pub directory: Option<PathBuf>,
    pub sources: Vec<PathBuf>,
    pub method: ZipMethod,
    pub level: Option<u8>,
    pub quiet: bool,
}

impl ZipOptions {
    pub fn settings(&self) -> ZipSettings {
        ZipSettings {
            method: self.method,
            level: self.level,
        }
    }

    pub fn host_args(&self, archive: &OsStr) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        let directory = self
            .directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        match self.tool {
            ZipTool::Zip => {
                args.push("-r".into());
                if self.quiet {
                    args.push("-q".into());
                }
                match (self.method, self.level) {
                    (ZipMethod::Store, _) => args.push("-0".into()),
                    (method, level) => {
                        if method != ZipMethod::Deflate {
                            args.push("-Z".into());
                            args.push(method.name().into());
                        }
                        if let Some(level) = level {
                            args.push(format!("-{}", level).into());
                        }
                    }
                }
                args.push(archive.to_owned());
                args.extend(self.sources.iter().map(OsString::from));
            }
            ZipTool::Unzip => {
                args.push("-o".into());
                if self.quiet {
                    args.push("-q".into());
                }
                args.push(archive.to_owned());
                args.push("-d".into());
                args.push(directory.into());
            }
            ZipTool::Unrar => {
                for arg in ["x", "-o+", "-y"] {
                    args.push(arg.into());
                }
                args.push(archive.to_owned());
                // unrar treats the last operand as a directory only with a trailing separator.
                let mut dest = directory.into_os_string();
                dest.push(std::path::MAIN_SEPARATOR_STR);
                args.push(dest);
            }
        }
        args
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "zip",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
struct ZipFlags {
    #[arg(short = 'O', long = "output-file")]
    output: Option<String>,
    #[arg(short = 'Z', long = "compression-method")]
    method: Option<String>,
    #[arg(short = 'r', long = "recurse-paths")]
    recurse: bool,
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
    paths: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "unzip",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
struct UnzipFlags {
    #[arg(short = 'd')]
    directory: Option<PathBuf>,
    #[arg(short = 'o')]
    overwrite: bool,
    #[arg(short = 'q')]
    quiet: bool,
    archives: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "unrar",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
struct UnrarFlags {
    #[arg(required = true, num_args = 1..)]
    operands: Vec<String>,
}

/// Removes `-0`..`-9` tokens (before any `--`), returning the last level seen.
fn take_level_flags(args: &[String]) -> (Vec<String>, Option<u8>) {
    let mut level = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut options_done = false;
    for arg in args {
        if arg == "--" {
            options_done = true;
        }
        match arg.strip_prefix('-').and_then(|d| d.parse::<u8>().ok()) {
            Some(n) if !options_done && arg.len() == 2 => level = Some(n),
            _ => rest.push(arg.clone()),
        }
    }
    (rest, level)
}

fn resolve_zip(args: &[String]) -> Result<ZipOptions> {
    let (args, level) = take_level_flags(args);
    let flags = ZipFlags::try_parse_from(&args).map_err(|e| parse_error("zip", e))?;
    debug!("zip flags: {:?} (recursion is always on, -r={})", flags, flags.recurse);

    let mut method = match &flags.method {
        Some(name) => ZipMethod::from_name(name).ok_or_else(|| {
            not_supported(format!("zip: compression method '{}' is not supported", name))
        })?,
        None => ZipMethod::default(),
    };
    let level = match level {
        Some(0) => {
            method = ZipMethod::Store;
            None
        }
        other => other,
    };

    let mut paths = flags.paths.into_iter();
    let destination = match flags.output {
        Some(output) => output,
        None => paths
            .next()
            .ok_or_else(|| not_supported("zip: an output archive is required"))?,
    };
    let sources: Vec<PathBuf> = paths.map(PathBuf::from).collect();
    if sources.is_empty() {
        return Err(not_supported("zip: nothing to do (no source paths)"));
    }

    Ok(ZipOptions {
        tool: ZipTool::Zip,
        mode: Mode::Create,
        archive: ArchiveTarget::from_arg(&destination),
        directory: None,
        sources,
        method,
        level,
        quiet: flags.quiet,
    })
}

fn resolve_unzip(args: &[String]) -> Result<ZipOptions> {
    let flags = UnzipFlags::try_parse_from(args).map_err(|e| parse_error("unzip", e))?;
    debug!("unzip flags: {:?} (overwrite is always on, -o={})", flags, flags.overwrite);
    let archive = match flags.archives.as_slice() {
        [archive] => ArchiveTarget::from_arg(archive),
        [] => return Err(not_supported("unzip: an archive is required")),
        _ => {
            return Err(not_supported(
                "unzip: extracting selected members is not supported",
            ))
        }
    };
    Ok(ZipOptions {
        tool: ZipTool::Unzip,
        mode: Mode::Extract,
        archive,
        directory: flags.directory,
        sources: Vec::new(),
        method: ZipMethod::default(),
        level: None,
        quiet: flags.quiet,
    })
}

/// unrar command words other than `x`. Listing, testing, printing and flat
/// extraction are left to the host binary.
const UNRAR_OTHER_COMMANDS: &[&str] = &[
    "a", "c", "ch", "cw", "d", "e", "f", "i", "k", "l", "lb", "lt", "lta", "m", "p", "r", "rc",
    "rr", "rv", "s", "t", "u", "v", "vb", "vt", "vta",
];

fn resolve_unrar(args: &[String]) -> Result<ZipOptions> {
    let flags = UnrarFlags::try_parse_from(args).map_err(|e| parse_error("unrar", e))?;
    let operands = match flags.operands.as_slice() {
        [command, rest @ ..] if command == "x" && !rest.is_empty() => rest,
        [command, ..] if UNRAR_OTHER_COMMANDS.contains(&command.to_ascii_lowercase().as_str()) => {
            return Err(not_supported(format!(
                "unrar: only the `x` command is supported, got `{}`",
                command
            )))
        }
        all => all,
    };
    let (archive, directory) = match operands {
        [archive] => (archive, None),
        [archive, directory] => (archive, Some(PathBuf::from(directory))),
        _ => {
            return Err(not_supported(
                "unrar: only `unrar [x] <archive> [<dir>]` is supported",
            ))
        }
    };
    if archive == "-" {
        return Err(not_supported("unrar: reading archives from stdin is not supported"));
    }
    Ok(ZipOptions {
        tool: ZipTool::Unrar,
        mode: Mode::Extract,
        archive: ArchiveTarget::from_arg(archive),
        directory,
        sources: Vec::new(),
        method: ZipMethod::default(),
        level: None,
        quiet: false,
    })
}

/// # Resolve Zip-family Arguments (`resolve`)
///
/// Parses `args` for `tool` (`zip`, `unzip` or `unrar`).
///
/// ## Errors
///
/// * `ShimError::Parse` for unknown flags or missing flag values.
/// * `ShimError::NotSupported` for unknown tools, missing operands, member
///   selection and unknown `-Z` methods.
pub fn resolve(tool: &str, args: &[String]) -> Result<ZipOptions> {
    match ZipTool::from_name(tool) {
        Some(ZipTool::Zip) => resolve_zip(args),
        Some(ZipTool::Unzip) => resolve_unzip(args),
        Some(ZipTool::Unrar) => resolve_unrar(args),
        None => Err(not_supported(format!("'{}' is not a zip-family command", tool))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ShimError;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    fn host_line(options: &ZipOptions, archive: &str) -> String {
        options
            .host_args(OsStr::new(archive))
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn is_not_supported(err: anyhow::Error) -> bool {
        matches!(err.downcast_ref::<ShimError>(), Some(ShimError::NotSupported(_)))
    }

    #[test]
    fn test_zip_defaults_to_deflate() {
        let options = resolve("zip", &args("-r out.zip docs")).unwrap();
        assert_eq!(options.mode, Mode::Create);
        assert_eq!(options.method, ZipMethod::Deflate);
        assert_eq!(options.level, None);
        assert_eq!(options.archive, ArchiveTarget::Path(PathBuf::from("out.zip")));
        assert_eq!(options.sources, vec![PathBuf::from("docs")]);
        assert_eq!(host_line(&options, "out.zip"), "-r out.zip docs");
    }

    #[test]
    fn test_unzip_defaults_to_deflate() {
        let options = resolve("unzip", &args("-o a.zip -d out")).unwrap();
        assert_eq!(options.mode, Mode::Extract);
        assert_eq!(options.method, ZipMethod::Deflate);
        assert_eq!(options.directory, Some(PathBuf::from("out")));
        assert_eq!(host_line(&options, "/tmp/a.zip"), "-o /tmp/a.zip -d out");
    }

    #[test]
    fn test_zip_output_flag_method_and_level() {
        let options = resolve("zip", &args("-q -Z bzip2 -9 -O - a b")).unwrap();
        assert_eq!(options.archive, ArchiveTarget::Stdio);
        assert_eq!(options.method, ZipMethod::Bzip2);
        assert_eq!(options.level, Some(9));
        assert_eq!(options.sources, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(host_line(&options, "-"), "-r -q -Z bzip2 -9 - a b");
    }

    #[test]
    fn test_zip_level_zero_means_store() {
        let options = resolve("zip", &args("-0 out.zip a")).unwrap();
        assert_eq!(options.method, ZipMethod::Store);
        assert_eq!(options.level, None);
        assert_eq!(host_line(&options, "out.zip"), "-r -0 out.zip a");
    }

    #[test]
    fn test_zip_rejections() {
        assert!(is_not_supported(resolve("zip", &args("-Z lzma out.zip a")).unwrap_err()));
        assert!(is_not_supported(resolve("zip", &args("out.zip")).unwrap_err()));
        assert!(is_not_supported(resolve("zip", &args("-r")).unwrap_err()));
        assert!(matches!(
            resolve("zip", &args("-u out.zip a"))
                .unwrap_err()
                .downcast_ref::<ShimError>(),
            Some(ShimError::Parse(_))
        ));
    }

    #[test]
    fn test_unzip_requires_exactly_one_archive() {
        assert!(is_not_supported(resolve("unzip", &args("-d out")).unwrap_err()));
        assert!(is_not_supported(resolve("unzip", &args("a.zip b.txt")).unwrap_err()));
    }

    #[test]
    fn test_unrar_forms() {
        let options = resolve("unrar", &args("x a.rar out")).unwrap();
        assert_eq!(options.archive, ArchiveTarget::Path(PathBuf::from("a.rar")));
        assert_eq!(options.directory, Some(PathBuf::from("out")));
        assert_eq!(options.tool.archive_format(), ArchiveFormat::Rar);

        let options = resolve("unrar", &args("a.rar")).unwrap();
        assert_eq!(options.directory, None);
        let expected = format!("x -o+ -y a.rar .{}", std::path::MAIN_SEPARATOR);
        assert_eq!(host_line(&options, "a.rar"), expected);

        assert!(is_not_supported(resolve("unrar", &args("x a.rar out extra")).unwrap_err()));
        assert!(resolve("unrar", &args("-y a.rar")).is_err());
    }

    #[test]
    fn test_unrar_other_commands_are_not_intercepted() {
        for line in ["l a.rar", "e a.rar", "t a.rar", "lb a.rar", "v a.rar out", "p a.rar"] {
            let err = resolve("unrar", &args(line)).unwrap_err();
            assert!(is_not_supported(err), "{} was accepted", line);
        }
        let options = resolve("unrar", &args("x l")).unwrap();
        assert_eq!(options.archive, ArchiveTarget::Path(PathBuf::from("l")));
    }
}
