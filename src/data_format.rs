//! Data-format preprocessor registry.
//!
//! The container format carries a data-format id so more
//! architectures can be added later; this crate ships exactly one,
//! [`DataFormat::ArmCortexM4`].

use crate::cortex_m4::{self, SpanConfig};
use crate::error::{Error, Result};
use crate::size;

/// A configured data-format preprocessor, ready to run over one
/// `(from, to)` pair.
#[derive(Debug, Clone)]
pub enum DataFormat {
    ArmCortexM4(SpanConfig),
}

impl DataFormat {
    pub fn id(&self) -> u64 {
        match self {
            DataFormat::ArmCortexM4(_) => cortex_m4::DATA_FORMAT_ID,
        }
    }

    /// Runs the preprocessor, mutating `from`/`to` in place and
    /// returning the opaque payload bytes that go inside the
    /// `data_format_block`.
    pub fn encode(&self, from: &mut [u8], to: &mut [u8]) -> Result<Vec<u8>> {
        match self {
            DataFormat::ArmCortexM4(cfg) => cortex_m4::encode(from, to, cfg),
        }
    }
}

/// Looks up a data-format identifier for the *decode* side, used only
/// by the test-only reference decoder: unknown ids must fail decode
/// with [`Error::UnknownDataFormat`].
pub fn check_known_id(id: u64) -> Result<()> {
    if id == cortex_m4::DATA_FORMAT_ID {
        Ok(())
    } else {
        Err(Error::UnknownDataFormat(id))
    }
}

/// Serializes the `data_format_block`: either `se(0)` when no
/// preprocessor ran, or `se(len) se(id) payload`.
pub fn encode_block(data_format: Option<&DataFormat>, from: &mut [u8], to: &mut [u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match data_format {
        None => size::encode(0, &mut out),
        Some(df) => {
            let payload = df.encode(from, to)?;
            size::encode(payload.len() as i64, &mut out);
            size::encode(df.id() as i64, &mut out);
            out.extend(payload);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_preprocessor_is_a_single_zero_size() {
        let mut from = vec![0u8; 8];
        let mut to = vec![0u8; 8];
        let block = encode_block(None, &mut from, &mut to).unwrap();
        assert_eq!(block, vec![0u8]);
    }

    #[test]
    fn unknown_id_is_rejected() {
        assert!(matches!(check_known_id(1), Err(Error::UnknownDataFormat(1))));
        assert!(check_known_id(0).is_ok());
    }
}
