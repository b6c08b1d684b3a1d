use super::Compressor;
use crate::error::Result;

/// Identity compressor: `feed` passes input through untouched, `finish`
/// has nothing left to flush.
pub struct NoneCompressor;

impl Compressor for NoneCompressor {
    fn feed(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_bytes_through() {
        let mut c = NoneCompressor;
        let mut out = c.feed(b"hello").unwrap();
        out.extend(Box::new(c).finish().unwrap());
        assert_eq!(out, b"hello");
    }
}
