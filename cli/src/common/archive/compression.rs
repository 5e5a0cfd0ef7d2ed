//! # arcshim Compression Utilities (`common::archive::compression`)
//!
//! File: cli/src/common/archive/compression.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! Stream compression for tarballs. `Compression` names every method the `tar`
//! resolver understands; only some have an embedded implementation:
//!
//! | Method  | Crate    | Embedded |
//! |---------|----------|----------|
//! | none    | -        | yes      |
//! | gzip    | `flate2` | yes      |
//! | bzip2   | `bzip2`  | yes      |
//! | xz      | `xz2`    | yes      |
//! | zstd    | `zstd`   | yes      |
//! | lzma    | -        | no       |
//! | lzip    | -        | no       |
//! | lzop    | -        | no       |
//!
//! `lzma`, `lzip` and `lzop` are only ever handled by a host `tar`; asking the
//! embedded engine for them yields `ShimError::UnsupportedFormat`.
//!
//! ## Usage
//!
//! ```rust
//! use arcshim::common::archive::compression::Compression;
//! use std::io::{Read, Write};
//!
//! # fn main() -> arcshim::core::error::Result<()> {
//! let mut writer = Compression::Gzip.encoder(Vec::new())?;
//! writer.write_all(b"payload")?;
//! let compressed = writer.finish()?;
//!
//! let mut plain = String::new();
//! Compression::Gzip.decoder(compressed.as_slice())?.read_to_string(&mut plain)?;
//! assert_eq!(plain, "payload");
//! # Ok(())
//! # }
//! ```
//!
use crate::core::error::{Result, ShimError};
use std::io::{self, Read, Write};
use std::path::Path;

/// Compression applied to a tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
    Lzma,
    Lzip,
    Lzop,
}

impl Compression {
    /// Maps a `--use-compress-program` value to a method.
    ///
    /// Only the program name is considered (`"zstd -19"` and `/usr/bin/zstd` both
    /// map to `Zstd`). Returns `None` for programs outside the known set.
    pub fn from_program(program: &str) -> Option<Self> {
        let name = program.split_whitespace().next()?;
        let name = Path::new(name).file_name()?.to_str()?;
        match name {
            "gzip" | "pigz" => Some(Self::Gzip),
            "bzip2" | "pbzip2" | "lbzip2" => Some(Self::Bzip2),
            "xz" | "pixz" => Some(Self::Xz),
            "zstd" | "pzstd" => Some(Self::Zstd),
            "lzma" => Some(Self::Lzma),
            "lzip" | "plzip" => Some(Self::Lzip),
            "lzop" => Some(Self::Lzop),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
            Self::Lzma => "lzma",
            Self::Lzip => "lzip",
            Self::Lzop => "lzop",
        }
    }

    /// Conventional extension of a tarball using this method.
    pub fn tar_extension(&self) -> &'static str {
        match self {
            Self::None => "tar",
            Self::Gzip => "tar.gz",
            Self::Bzip2 => "tar.bz2",
            Self::Xz => "tar.xz",
            Self::Zstd => "tar.zst",
            Self::Lzma => "tar.lzma",
            Self::Lzip => "tar.lz",
            Self::Lzop => "tar.lzo",
        }
    }

    /// The GNU tar flag selecting this method, if any.
    pub fn tar_flag(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Gzip => Some("-z"),
            Self::Bzip2 => Some("-j"),
            Self::Xz => Some("-J"),
            Self::Zstd => Some("--zstd"),
            Self::Lzma => Some("--lzma"),
            Self::Lzip => Some("--lzip"),
            Self::Lzop => Some("--lzop"),
        }
    }

    /// Whether the embedded engine can encode and decode this method.
    pub fn is_embedded(&self) -> bool {
        matches!(
            self,
            Self::None | Self::Gzip | Self::Bzip2 | Self::Xz | Self::Zstd
        )
    }

    fn unsupported(&self) -> anyhow::Error {
        ShimError::UnsupportedFormat {
            format: self.tar_extension().to_string(),
        }
        .into()
    }

    /// Wraps `reader` in a decoder for this method.
    ///
    /// Multi-member streams (as produced by `pigz`, `pbzip2` or concatenation) are
    /// decoded in full.
    pub fn decoder<'a, R: Read + 'a>(&self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Self::None => Box::new(reader),
            Self::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            Self::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
            Self::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)),
            Self::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
            Self::Lzma | Self::Lzip | Self::Lzop => return Err(self.unsupported()),
        })
    }

    /// Wraps `writer` in an encoder for this method, using default levels.
    pub fn encoder<W: Write>(&self, writer: W) -> Result<CompressWriter<W>> {
        Ok(match self {
            Self::None => CompressWriter::Plain(writer),
            Self::Gzip => CompressWriter::Gzip(flate2::write::GzEncoder::new(
                writer,
                flate2::Compression::default(),
            )),
            Self::Bzip2 => CompressWriter::Bzip2(bzip2::write::BzEncoder::new(
                writer,
                bzip2::Compression::default(),
            )),
            Self::Xz => CompressWriter::Xz(xz2::write::XzEncoder::new(writer, 6)),
            Self::Zstd => CompressWriter::Zstd(zstd::stream::write::Encoder::new(
                writer,
                zstd::DEFAULT_COMPRESSION_LEVEL,
            )?),
            Self::Lzma | Self::Lzip | Self::Lzop => return Err(self.unsupported()),
        })
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A writer that compresses into `W`. Call `finish` to write trailers.
pub enum CompressWriter<W: Write> {
    Plain(W),
    Gzip(flate2::write::GzEncoder<W>),
    Bzip2(bzip2::write::BzEncoder<W>),
    Xz(xz2::write::XzEncoder<W>),
    Zstd(zstd::stream::write::Encoder<'static, W>),
}

impl<W: Write> CompressWriter<W> {
    /// Flushes the compressed stream and returns the inner writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::Plain(mut w) => {
                w.flush()?;
                Ok(w)
            }
            Self::Gzip(enc) => enc.finish(),
            Self::Bzip2(enc) => enc.finish(),
            Self::Xz(enc) => enc.finish(),
            Self::Zstd(enc) => enc.finish(),
        }
    }
}

impl<W: Write> Write for CompressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
            Self::Bzip2(w) => w.write(buf),
            Self::Xz(w) => w.write(buf),
            Self::Zstd(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
            Self::Bzip2(w) => w.flush(),
            Self::Xz(w) => w.flush(),
            Self::Zstd(w) => w.flush(),
        }
    }
}
