//! Test-only reference decoder.
//!
//! Implements exactly the container contract -- nothing more -- so the
//! encoder's round-trip properties can be checked in-process. Not part
//! of the public API; production apply is out of scope for this
//! crate. Data-format payloads are only skipped, never reconstructed:
//! tests that exercise the Cortex-M4 preprocessor check its effects
//! through `cortex_m4`'s own unit tests and through patch-size
//! assertions, not through this decoder.

use detools::{CompressionKind, PatchType};

/// Re-decodes a size-encoded integer. Deliberately duplicated here
/// rather than exposed from the crate: the encoder's public surface
/// has no need for a decoder, and this one is small enough to keep
/// in sync by inspection.
fn decode_size(buf: &[u8]) -> (i64, usize) {
    let first = buf[0];
    let sign = (first & 0x40) != 0;
    let mut magnitude: u128 = (first & 0x3f) as u128;
    let mut shift = 6u32;
    let mut more = (first & 0x80) != 0;
    let mut consumed = 1usize;

    while more {
        let byte = buf[consumed];
        consumed += 1;
        magnitude |= ((byte & 0x7f) as u128) << shift;
        shift += 7;
        more = (byte & 0x80) != 0;
    }

    let value: i128 = if sign { -(magnitude as i128) } else { magnitude as i128 };
    (value as i64, consumed)
}

fn div_ceil(n: u64, d: u64) -> u64 {
    (n + d - 1) / d
}

/// Parses one normal-inner-body (`data_format_block` + `bsdiff_stream`)
/// from the front of `body`, reconstructing `to` from `from`. Returns
/// the number of bytes consumed.
///
/// Panics if the data-format block is non-empty: reconstructing a
/// Cortex-M4 payload requires re-disassembling `to` as it is produced,
/// which is apply-side logic out of scope for this crate.
fn decode_inner_body(body: &[u8], from: &[u8]) -> (usize, Vec<u8>) {
    let mut pos = 0usize;

    let (data_format_len, used) = decode_size(&body[pos..]);
    pos += used;
    assert_eq!(
        data_format_len, 0,
        "reference decoder cannot reconstruct data-format preprocessor effects"
    );

    let mut to = Vec::new();
    let mut cursor: i64 = 0;

    loop {
        let (copy_len, u1) = decode_size(&body[pos..]);
        pos += u1;
        let (extra_len, u2) = decode_size(&body[pos..]);
        pos += u2;
        let (seek_adjust, u3) = decode_size(&body[pos..]);
        pos += u3;

        if copy_len == 0 && extra_len == 0 && seek_adjust == 0 {
            break;
        }

        for k in 0..copy_len as usize {
            let diff = body[pos];
            pos += 1;
            let si = cursor + k as i64;
            let x = if si >= 0 {
                from.get(si as usize).copied().unwrap_or(0)
            } else {
                0
            };
            to.push(diff.wrapping_add(x));
        }

        let extra_len = extra_len as usize;
        to.extend_from_slice(&body[pos..pos + extra_len]);
        pos += extra_len;

        cursor += copy_len + seek_adjust;
    }

    (pos, to)
}

/// Applies a normal patch produced by [`detools::encode_normal`]
/// (with `data_format = None`) against `from`, reconstructing `to`.
pub fn decode_normal(patch: &[u8], from: &[u8]) -> Vec<u8> {
    let mut pos = 0usize;
    let (patch_type, compression) = detools::container::unpack_header(patch[pos]).unwrap();
    assert_eq!(patch_type, PatchType::Normal);
    pos += 1;

    let (to_size, used) = decode_size(&patch[pos..]);
    pos += used;
    if to_size == 0 {
        return Vec::new();
    }

    let body = detools::compress::decompress_all(compression, &patch[pos..]).unwrap();
    let (_, to) = decode_inner_body(&body, from);
    to
}

/// Applies an in-place patch produced by [`detools::encode_in_place`]
/// (with `data_format = None`) against `from`, reconstructing `to`.
pub fn decode_in_place(patch: &[u8], from: &[u8]) -> Vec<u8> {
    let mut pos = 0usize;
    let (patch_type, compression) = detools::container::unpack_header(patch[pos]).unwrap();
    assert_eq!(patch_type, PatchType::InPlace);
    pos += 1;

    let (memory_size, u) = decode_size(&patch[pos..]);
    pos += u;
    let (segment_size, u) = decode_size(&patch[pos..]);
    pos += u;
    let (shift_size, u) = decode_size(&patch[pos..]);
    pos += u;
    let (_from_size, u) = decode_size(&patch[pos..]);
    pos += u;
    let (to_size, u) = decode_size(&patch[pos..]);
    pos += u;

    if to_size == 0 {
        return Vec::new();
    }

    let body = detools::compress::decompress_all(compression, &patch[pos..]).unwrap();

    let memory_size = memory_size as u64;
    let segment_size = segment_size as u64;
    let shift_size = shift_size as u64;

    let shifted_len = (memory_size.saturating_sub(shift_size) as usize).min(from.len());
    let shifted_from = &from[..shifted_len];

    let num_segments = div_ceil(to_size as u64, segment_size) as usize;

    let mut to = Vec::with_capacity(to_size as usize);
    let mut cursor = 0usize;
    for k in 0..num_segments {
        let from_cut = (k as u64) * segment_size + segment_size;
        let from_offset = (from_cut.saturating_sub(shift_size) as usize).min(shifted_from.len());
        let from_seg = &shifted_from[from_offset..];

        let (seg_to_len, used) = decode_size(&body[cursor..]);
        cursor += used;
        let (consumed, seg_to) = decode_inner_body(&body[cursor..], from_seg);
        cursor += consumed;
        assert_eq!(seg_to.len(), seg_to_len as usize);
        to.extend(seg_to);
    }

    to
}

#[allow(dead_code)]
pub fn compression_kinds() -> [CompressionKind; 3] {
    [CompressionKind::None, CompressionKind::Lzma, CompressionKind::Crle]
}
