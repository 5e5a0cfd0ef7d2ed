//! # arcshim `tar` Option Resolver (`shim::tar`)
//!
//! File: cli/src/shim/tar.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! Turns a `tar` argument list into `TarOptions`. Only the flags below are
//! recognized; anything else is a parse error.
//!
//! | Flag | Meaning |
//! |------|---------|
//! | `-x`, `--extract` / `-c`, `--create` | mode (exactly one) |
//! | `-f`, `--file <path>` | archive, `-` for stdin/stdout |
//! | `-C`, `--directory <dir>` | extraction target or source base |
//! | `-z` `-j` `-J` `--zstd` `--lzma` `--lzip` `--lzop` | compression |
//! | `-I`, `--use-compress-program <prog>` | compression by program name |
//! | `-m`, `--touch`, `--no-same-owner`, `--no-same-permissions` | host only |
//!
//! Old-style bundled first arguments (`tar xzf a.tgz`, `tar cfz out.tgz dir`)
//! are rewritten to dashed flags first. `f`, `C` and `I` take the following
//! arguments in the order the letters appear.
//!
use super::{not_supported, parse_error, ArchiveTarget, Mode, Registry};
use crate::common::archive::compression::Compression;
use crate::core::error::{Result, ShimError};
use clap::Parser;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use tracing::debug;

/// Registers the `tar` command.
pub fn register(registry: &mut Registry) {
    registry.register("tar", super::CommandFamily::Tar);
}

#[derive(Parser, Debug)]
#[command(
    name = "tar",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
struct TarFlags {
    #[arg(short = 'x', long = "extract", visible_alias = "get")]
    extract: bool,
    #[arg(short = 'c', long = "create")]
    create: bool,
    #[arg(short = 'f', long = "file")]
    file: Option<String>,
    #[arg(short = 'C', long = "directory")]
    directory: Option<PathBuf>,

    #[arg(short = 'z', long = "gzip", alias = "gunzip", alias = "ungzip")]
    gzip: bool,
    #[arg(short = 'j', long = "bzip2")]
    bzip2: bool,
    #[arg(short = 'J', long = "xz")]
    xz: bool,
    #[arg(long)]
    zstd: bool,
    #[arg(long)]
    lzma: bool,
    #[arg(long)]
    lzip: bool,
    #[arg(long)]
    lzop: bool,
    #[arg(short = 'I', long = "use-compress-program")]
    compress_program: Option<String>,

    #[arg(short = 'm', long = "touch")]
    touch: bool,
    #[arg(long)]
    no_same_owner: bool,
    #[arg(long)]
    no_same_permissions: bool,

    paths: Vec<PathBuf>,
}

/// Normalized `tar` command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarOptions {
    pub mode: Mode,
    pub archive: ArchiveTarget,
    /// `-C`: where to extract, or what sources are relative to.
    pub directory: Option<PathBuf>,
    pub compression: Compression,
    /// `-I` value as given; passed through to the host binary verbatim.
    pub compress_program: Option<String>,
    pub sources: Vec<PathBuf>,
    pub touch: bool,
    pub no_same_owner: bool,
    pub no_same_permissions: bool,
}

impl TarOptions {
    pub fn host_args(&self, archive: &OsStr) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![match self.mode {
            Mode::Create => "-c".into(),
            Mode::Extract => "-x".into(),
        }];
        match (&self.compress_program, self.compression.tar_flag()) {
            (Some(program), _) => {
                args.push("-I".into());
                args.push(program.into());
            }
            (None, Some(flag)) => args.push(flag.into()),
            (None, None) => {}
        }
        args.push("-f".into());
        args.push(archive.to_owned());
        if let Some(directory) = &self.directory {
            args.push("-C".into());
            args.push(directory.into());
        }
        if self.touch {
            args.push("-m".into());
        }
        if self.no_same_owner {
            args.push("--no-same-owner".into());
        }
        if self.no_same_permissions {
            args.push("--no-same-permissions".into());
        }
        args.extend(self.sources.iter().map(OsString::from));
        args
    }

    pub fn ignored_flags(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if self.touch {
            ignored.push("-m/--touch");
        }
        if self.no_same_owner {
            ignored.push("--no-same-owner");
        }
        if self.no_same_permissions {
            ignored.push("--no-same-permissions");
        }
        ignored
    }
}

/// Rewrites an old-style first argument (`xzf`) into dashed flags.
fn expand_legacy_args(args: &[String]) -> Vec<String> {
    let Some(first) = args.first() else {
        return Vec::new();
    };
    if first.is_empty() || first.starts_with('-') {
        return args.to_vec();
    }

    let mut rest = args[1..].iter();
    let mut expanded = Vec::with_capacity(args.len() + first.len());
    for letter in first.chars() {
        expanded.push(format!("-{}", letter));
        if matches!(letter, 'f' | 'C' | 'I') {
            if let Some(value) = rest.next() {
                expanded.push(value.clone());
            }
        }
    }
    expanded.extend(rest.cloned());
    debug!("Expanded legacy tar arguments {:?} to {:?}", args, expanded);
    expanded
}

fn select_compression(flags: &TarFlags) -> Result<Compression> {
    if let Some(program) = &flags.compress_program {
        return Compression::from_program(program).ok_or_else(|| {
            not_supported(format!(
                "tar: compression program '{}' is not supported",
                program
            ))
        });
    }

    let selected: Vec<Compression> = [
        (flags.gzip, Compression::Gzip),
        (flags.bzip2, Compression::Bzip2),
        (flags.xz, Compression::Xz),
        (flags.zstd, Compression::Zstd),
        (flags.lzma, Compression::Lzma),
        (flags.lzip, Compression::Lzip),
        (flags.lzop, Compression::Lzop),
    ]
    .into_iter()
    .filter_map(|(set, compression)| set.then_some(compression))
    .collect();

    match selected.as_slice() {
        [] => Ok(Compression::None),
        [one] => Ok(*one),
        _ => Err(ShimError::Parse(format!(
            "tar: conflicting compression options: {}",
            selected
                .iter()
                .map(Compression::name)
                .collect::<Vec<_>>()
                .join(", ")
        ))
        .into()),
    }
}

/// # Resolve `tar` Arguments (`resolve`)
///
/// Parses and validates `args` (without the program name).
///
/// ## Errors
///
/// * `ShimError::Parse` for unknown flags, missing values or conflicting
///   compression flags.
/// * `ShimError::NotSupported` when the command line is well-formed but outside
///   the supported subset: no mode or both modes, extraction without `-f` or
///   with member names, creation without sources, or an unknown `-I` program.
pub fn resolve(args: &[String]) -> Result<TarOptions> {
    let expanded = expand_legacy_args(args);
    let flags = TarFlags::try_parse_from(&expanded).map_err(|e| parse_error("tar", e))?;

    let mode = match (flags.create, flags.extract) {
        (true, false) => Mode::Create,
        (false, true) => Mode::Extract,
        (true, true) => return Err(not_supported("tar: -c and -x cannot be combined")),
        (false, false) => return Err(not_supported("tar: one of -c or -x is required")),
    };
    let compression = select_compression(&flags)?;

    let archive = match (&flags.file, mode) {
        (Some(file), _) => ArchiveTarget::from_arg(file),
        (None, Mode::Create) => ArchiveTarget::Stdio,
        (None, Mode::Extract) => {
            return Err(not_supported("tar: extraction requires -f <archive>"))
        }
    };
    match mode {
        Mode::Extract if !flags.paths.is_empty() => {
            return Err(not_supported(
                "tar: extracting selected members is not supported",
            ))
        }
        Mode::Create if flags.paths.is_empty() => {
            return Err(not_supported(
                "tar: refusing to create an empty archive (no source paths)",
            ))
        }
        _ => {}
    }

    Ok(TarOptions {
        mode,
        archive,
        directory: flags.directory,
        compression,
        compress_program: flags.compress_program,
        sources: flags.paths,
        touch: flags.touch,
        no_same_owner: flags.no_same_owner,
        no_same_permissions: flags.no_same_permissions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    fn error_of(line: &str) -> ShimError {
        let err = resolve(&args(line)).unwrap_err();
        match err.downcast::<ShimError>() {
            Ok(shim) => shim,
            Err(other) => panic!("unexpected error type: {:?}", other),
        }
    }

    #[test]
    fn test_legacy_extract_from_stdin() {
        let options = resolve(&args("xf - -C /dest")).unwrap();
        assert_eq!(options.mode, Mode::Extract);
        assert_eq!(options.archive, ArchiveTarget::Stdio);
        assert_eq!(options.directory, Some(PathBuf::from("/dest")));
        assert_eq!(options.compression, Compression::None);
    }

    #[test]
    fn test_legacy_create_gzip_to_stdout() {
        let options = resolve(&args("czf - dir1 dir2")).unwrap();
        assert_eq!(options.mode, Mode::Create);
        assert_eq!(options.archive, ArchiveTarget::Stdio);
        assert_eq!(options.compression, Compression::Gzip);
        assert_eq!(
            options.sources,
            vec![PathBuf::from("dir1"), PathBuf::from("dir2")]
        );
    }

    #[test]
    fn test_legacy_letters_consume_values_in_order() {
        let options = resolve(&args("cfCz out.tgz src a b")).unwrap();
        assert_eq!(
            options.archive,
            ArchiveTarget::Path(PathBuf::from("out.tgz"))
        );
        assert_eq!(options.directory, Some(PathBuf::from("src")));
        assert_eq!(options.compression, Compression::Gzip);
        assert_eq!(options.sources, vec![PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn test_dashed_and_long_forms() {
        let options = resolve(&args("--extract --xz --file=a.txz --directory out")).unwrap();
        assert_eq!(options.compression, Compression::Xz);
        assert_eq!(options.archive, ArchiveTarget::Path(PathBuf::from("a.txz")));

        let options = resolve(&args("-xjf a.tbz")).unwrap();
        assert_eq!(options.compression, Compression::Bzip2);
    }

    #[test]
    fn test_create_without_file_writes_stdout() {
        let options = resolve(&args("-c --zstd src")).unwrap();
        assert_eq!(options.archive, ArchiveTarget::Stdio);
        assert_eq!(options.compression, Compression::Zstd);
    }

    #[test]
    fn test_compress_program_precedence() {
        let options = resolve(&args("-c -z -I pzstd -f out.tar src")).unwrap();
        assert_eq!(options.compression, Compression::Zstd);
        assert_eq!(options.compress_program.as_deref(), Some("pzstd"));

        assert!(matches!(
            error_of("-c -I brotli -f out.tar src"),
            ShimError::NotSupported(_)
        ));
    }

    #[test]
    fn test_mode_validation() {
        assert!(matches!(error_of("-f a.tar"), ShimError::NotSupported(_)));
        assert!(matches!(error_of("-cx -f a.tar src"), ShimError::NotSupported(_)));
        assert!(matches!(error_of("-x"), ShimError::NotSupported(_)));
        assert!(matches!(error_of("-cf out.tar"), ShimError::NotSupported(_)));
        assert!(matches!(
            error_of("-xf a.tar member.txt"),
            ShimError::NotSupported(_)
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(error_of("-xvf a.tar"), ShimError::Parse(_)));
        assert!(matches!(error_of("-xzjf a.tar"), ShimError::Parse(_)));
        assert!(matches!(error_of("-xf"), ShimError::Parse(_)));
    }

    #[test]
    fn test_host_args_and_ignored_flags() {
        let options =
            resolve(&args("-x -z -m --no-same-owner -f a.tgz -C out")).unwrap();
        let host: Vec<String> = options
            .host_args(OsStr::new("/tmp/staged"))
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            host,
            args("-x -z -f /tmp/staged -C out -m --no-same-owner")
        );
        assert_eq!(options.ignored_flags(), vec!["-m/--touch", "--no-same-owner"]);

        let options = resolve(&args("-c -I pigz -f - src")).unwrap();
        let host: Vec<String> = options
            .host_args(OsStr::new("-"))
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(host, args("-c -I pigz -f - src"));
    }
}
