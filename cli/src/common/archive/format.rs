//! # arcshim Archive Format Detection (`common::archive::format`)
//!
//! File: cli/src/common/archive/format.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! Identifies archive formats from file contents. Extension-based guessing is
//! deliberately absent: archives arriving on stdin are staged under random names,
//! so only the leading bytes are trustworthy.
//!
//! Compressed streams (gzip, bzip2, xz, zstd, lzip, lzop) are reported as
//! compressed tarballs, which is what every intercepted command expects to find
//! inside them. Legacy `.lzma` streams carry no reliable signature and are never
//! sniffed; they are only handled through the format implied by the command line.
//!
use super::compression::Compression;
use crate::core::error::Result;
use anyhow::Context;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Number of leading bytes needed to see every signature (tar's is at 257..262).
const SNIFF_LEN: usize = 512;

/// An archive container, with its outer compression for tarballs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Tar(Compression),
    Zip,
    Rar,
    SevenZip,
}

impl ArchiveFormat {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tar(compression) => compression.tar_extension(),
            Self::Zip => "zip",
            Self::Rar => "rar",
            Self::SevenZip => "7z",
        }
    }

    /// Whether the embedded engine can unpack this format.
    pub fn can_extract(&self) -> bool {
        match self {
            Self::Tar(compression) => compression.is_embedded(),
            Self::Zip | Self::Rar => true,
            Self::SevenZip => false,
        }
    }

    /// Whether the embedded engine can build this format.
    pub fn can_create(&self) -> bool {
        match self {
            Self::Tar(compression) => compression.is_embedded(),
            Self::Zip => true,
            Self::Rar | Self::SevenZip => false,
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies a format from the first bytes of a file.
pub fn sniff(header: &[u8]) -> Option<ArchiveFormat> {
    const LZOP: &[u8] = &[0x89, b'L', b'Z', b'O', 0x00, 0x0d, 0x0a, 0x1a, 0x0a];
    const XZ: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];
    const ZSTD: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];
    const SEVEN_ZIP: &[u8] = &[b'7', b'z', 0xbc, 0xaf, 0x27, 0x1c];

    if header.starts_with(b"PK\x03\x04")
        || header.starts_with(b"PK\x05\x06")
        || header.starts_with(b"PK\x07\x08")
    {
        return Some(ArchiveFormat::Zip);
    }
    if header.starts_with(b"Rar!\x1a\x07") {
        return Some(ArchiveFormat::Rar);
    }
    if header.starts_with(SEVEN_ZIP) {
        return Some(ArchiveFormat::SevenZip);
    }
    let compression = if header.starts_with(&[0x1f, 0x8b]) {
        Compression::Gzip
    } else if header.starts_with(b"BZh") {
        Compression::Bzip2
    } else if header.starts_with(XZ) {
        Compression::Xz
    } else if header.starts_with(ZSTD) {
        Compression::Zstd
    } else if header.starts_with(b"LZIP") {
        Compression::Lzip
    } else if header.starts_with(LZOP) {
        Compression::Lzop
    } else if header.len() >= 262 && &header[257..262] == b"ustar" {
        Compression::None
    } else {
        return None;
    };
    Some(ArchiveFormat::Tar(compression))
}

/// Identifies the format of the file at `path`.
///
/// ## Returns
///
/// * `Ok(Some(format))` when a signature matched.
/// * `Ok(None)` when the contents are not recognized (including empty files).
///
/// ## Errors
///
/// Returns an `Err` if the file cannot be opened or read.
pub fn detect_file(path: &Path) -> Result<Option<ArchiveFormat>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open archive for detection: {}", path.display()))?;
    let mut header = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64)
        .read_to_end(&mut header)
        .with_context(|| format!("Failed to read archive header: {}", path.display()))?;
    let detected = sniff(&header);
    debug!("Detected format of {}: {:?}", path.display(), detected);
    Ok(detected)
}
