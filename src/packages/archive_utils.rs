// src/packages/archive_utils.rs
//! Helpers for reading members out of package archives

use flate2::read::GzDecoder;
use std::io::{self, Read};
use xz2::read::XzDecoder;

/// Default maximum size of a decompressed control file (1 MiB).
pub const MAX_CONTROL_SIZE: u64 = 1024 * 1024;

/// Compression of a `control.tar*` / `data.tar*` member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberCompression {
    None,
    Gzip,
    Xz,
    Zstd,
}

impl MemberCompression {
    /// Detect compression from an ar member name such as `control.tar.xz`
    pub fn from_member_name(name: &str, stem: &str) -> Option<Self> {
        match name.strip_prefix(stem)? {
            "" => Some(Self::None),
            ".gz" => Some(Self::Gzip),
            ".xz" => Some(Self::Xz),
            ".zst" => Some(Self::Zstd),
            _ => None,
        }
    }

    /// Wrap `reader` in the matching decoder
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Self::None => Box::new(reader),
            Self::Gzip => Box::new(GzDecoder::new(reader)),
            Self::Xz => Box::new(XzDecoder::new(reader)),
            Self::Zstd => Box::new(zstd::Decoder::new(reader)?),
        })
    }
}

/// Read all of `reader`, failing once more than `limit` bytes arrive
pub fn read_limited<R: Read>(reader: R, limit: u64) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut buf)?;
    if buf.len() as u64 > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("member exceeds {} bytes", limit),
        ));
    }
    Ok(buf)
}
