//! Compressor adapters: a uniform streaming interface over the three
//! container compression schemes.

mod crle;
mod lzma;
mod none;

pub use crle::CrleCompressor;
pub use lzma::LzmaCompressor;
pub use none::NoneCompressor;

use crate::error::{Error, Result};

/// Streaming compressor. `feed` may return output immediately or defer
/// everything to `finish` (lzma-rs has no true incremental encoder, so
/// [`LzmaCompressor`] buffers and does the real work at `finish`).
pub trait Compressor {
    fn feed(&mut self, data: &[u8]) -> Result<Vec<u8>>;
    fn finish(self: Box<Self>) -> Result<Vec<u8>>;
}

/// Compression scheme selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    None,
    Lzma,
    Crle,
}

impl CompressionKind {
    pub fn id(self) -> u8 {
        match self {
            CompressionKind::None => 0,
            CompressionKind::Lzma => 1,
            CompressionKind::Crle => 2,
        }
    }

    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(CompressionKind::None),
            1 => Ok(CompressionKind::Lzma),
            2 => Ok(CompressionKind::Crle),
            other => Err(Error::BadCompression(format!("id {}", other))),
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "none" => Ok(CompressionKind::None),
            "lzma" => Ok(CompressionKind::Lzma),
            "crle" => Ok(CompressionKind::Crle),
            other => Err(Error::BadCompression(other.to_string())),
        }
    }
}

/// Builds the adapter for `kind`.
pub fn create(kind: CompressionKind) -> Box<dyn Compressor> {
    match kind {
        CompressionKind::None => Box::new(NoneCompressor),
        CompressionKind::Lzma => Box::new(LzmaCompressor::new()),
        CompressionKind::Crle => Box::new(CrleCompressor::new()),
    }
}

/// Convenience one-shot compression of a complete buffer.
pub fn compress_all(kind: CompressionKind, data: &[u8]) -> Result<Vec<u8>> {
    let mut compressor = create(kind);
    let mut out = compressor.feed(data)?;
    out.extend(compressor.finish()?);
    Ok(out)
}

/// One-shot decompression of a complete buffer. Not a production
/// decode API -- apply/decode is out of scope for this crate -- but
/// exposed so the test-only reference decoder under `tests/common` can
/// verify encoder round trips without duplicating each scheme's wire
/// format.
#[doc(hidden)]
pub fn decompress_all(kind: CompressionKind, data: &[u8]) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::None => Ok(data.to_vec()),
        CompressionKind::Lzma => lzma::decode(data),
        CompressionKind::Crle => crle::decode(data),
    }
}
