//! Container writer: header byte, size fields, and the two patch
//! flavors, normal and in-place.

use crate::bsdiff::{self, EncoderOptions};
use crate::compress::{self, CompressionKind};
use crate::data_format::DataFormat;
use crate::error::{Error, Result};
use crate::inplace::{self, InPlaceOptions};
use crate::sais;
use crate::size;

/// Which of the two patch shapes a container holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchType {
    Normal,
    InPlace,
}

impl PatchType {
    pub fn id(self) -> u8 {
        match self {
            PatchType::Normal => 0,
            PatchType::InPlace => 1,
        }
    }

    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(PatchType::Normal),
            1 => Ok(PatchType::InPlace),
            other => Err(Error::BadPatchType(format!("id {}", other))),
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "normal" => Ok(PatchType::Normal),
            "in-place" => Ok(PatchType::InPlace),
            other => Err(Error::BadPatchType(other.to_string())),
        }
    }
}

/// Packs the header byte: 1 reserved bit (clear), 3 bits patch type, 4
/// bits compression id.
pub fn pack_header(patch_type: PatchType, compression: CompressionKind) -> u8 {
    ((patch_type.id() & 0x7) << 4) | (compression.id() & 0xF)
}

pub fn unpack_header(byte: u8) -> Result<(PatchType, CompressionKind)> {
    let patch_type = PatchType::from_id((byte >> 4) & 0x7)?;
    let compression = CompressionKind::from_id(byte & 0xF)?;
    Ok((patch_type, compression))
}

/// Builds the uncompressed `data_format_block || bsdiff_stream` body
/// shared by every normal patch and every in-place segment.
pub(crate) fn encode_inner(
    from: &[u8],
    to: &[u8],
    data_format: Option<&DataFormat>,
    opts: &EncoderOptions,
) -> Result<Vec<u8>> {
    let mut from_buf = from.to_vec();
    let mut to_buf = to.to_vec();

    let mut out = crate::data_format::encode_block(data_format, &mut from_buf, &mut to_buf)?;

    let sa = sais::build(&from_buf);
    log::debug!("suffix array built over {} bytes", from_buf.len());
    out.extend(bsdiff::encode(&sa, &from_buf, &to_buf, opts));
    Ok(out)
}

/// Produces a complete normal patch.
pub fn encode_normal(
    from: &[u8],
    to: &[u8],
    compression: CompressionKind,
    data_format: Option<&DataFormat>,
    opts: &EncoderOptions,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.push(pack_header(PatchType::Normal, compression));
    size::encode(to.len() as i64, &mut out);

    if to.is_empty() {
        return Ok(out);
    }

    let inner = encode_inner(from, to, data_format, opts)?;
    out.extend(compress::compress_all(compression, &inner)?);
    Ok(out)
}

/// Produces a complete in-place patch, segmenting `to` and shifting
/// the `from` window so the patch can be applied into the same memory
/// region it updates.
pub fn encode_in_place(
    from: &[u8],
    to: &[u8],
    compression: CompressionKind,
    data_format: Option<&DataFormat>,
    plan: &InPlaceOptions,
    opts: &EncoderOptions,
) -> Result<Vec<u8>> {
    let params = inplace::resolve(plan, from.len() as u64)?;

    let mut out = Vec::new();
    out.push(pack_header(PatchType::InPlace, compression));
    size::encode(params.memory_size as i64, &mut out);
    size::encode(params.segment_size as i64, &mut out);
    size::encode(params.shift_size as i64, &mut out);
    size::encode(from.len() as i64, &mut out);
    size::encode(to.len() as i64, &mut out);

    if to.is_empty() {
        return Ok(out);
    }

    let segments = inplace::build_segments(&params, from, to, data_format, opts)?;
    out.extend(compress::compress_all(compression, &segments)?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        for pt in [PatchType::Normal, PatchType::InPlace] {
            for ck in [CompressionKind::None, CompressionKind::Lzma, CompressionKind::Crle] {
                let byte = pack_header(pt, ck);
                assert_eq!(unpack_header(byte).unwrap(), (pt, ck));
            }
        }
    }

    #[test]
    fn empty_to_short_circuits_normal_patch() {
        let from = vec![0u8, 1, 2];
        let to: Vec<u8> = Vec::new();
        let patch = encode_normal(&from, &to, CompressionKind::None, None, &EncoderOptions::default()).unwrap();

        let mut expected = vec![pack_header(PatchType::Normal, CompressionKind::None)];
        size::encode(0, &mut expected);
        assert_eq!(patch, expected);
    }

    #[test]
    fn identity_patch_is_small() {
        let data = b"the quick brown fox".to_vec();
        let patch = encode_normal(&data, &data, CompressionKind::None, None, &EncoderOptions::default()).unwrap();
        // header + se(len) + se(0) data-format + control (len,0,0) + diff zeros + terminator
        assert!(patch.len() < data.len() + 16, "patch.len()={}", patch.len());
    }
}
