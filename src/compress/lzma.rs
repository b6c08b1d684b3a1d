use super::Compressor;
use crate::error::{Error, Result};
use std::io::Cursor;

/// Wraps `lzma-rs`'s "alone" (legacy) container format, matching the
/// Python source's `lzma.LZMACompressor(format=FORMAT_ALONE)`.
///
/// `lzma-rs` has no incremental encoder, so `feed` just accumulates
/// into a buffer and the real compression pass runs once, at `finish`.
pub struct LzmaCompressor {
    buffer: Vec<u8>,
}

impl LzmaCompressor {
    pub fn new() -> Self {
        LzmaCompressor { buffer: Vec::new() }
    }
}

impl Default for LzmaCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for LzmaCompressor {
    fn feed(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.buffer.extend_from_slice(data);
        Ok(Vec::new())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>> {
        let mut input = Cursor::new(self.buffer);
        let mut output = Vec::new();
        lzma_rs::lzma_compress(&mut input, &mut output)?;
        Ok(output)
    }
}

/// Decodes an alone-format LZMA stream. Test-only reference-decoder
/// support; production decode is out of scope for this crate.
#[doc(hidden)]
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut input = Cursor::new(data);
    let mut output = Vec::new();
    lzma_rs::lzma_decompress(&mut input, &mut output).map_err(|e| {
        Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    })?;
    Ok(output)
}
