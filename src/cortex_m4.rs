//! Cortex-M4 (Thumb-2) data-format preprocessor.
//!
//! Rewrites PC-relative branch/load immediates and in-range pointer
//! literals into zero-filled positions so the generic bsdiff pass
//! matches across relocations instead of treating every moved
//! reference as noise. What got rewritten is recorded as residuals
//! (`from_value - to_value`) in six per-category block lists, emitted
//! in a fixed per-category layout.

use crate::error::{Error, Result};
use crate::lcs;
use crate::size;
use byteorder::{ByteOrder, LE};
use std::collections::BTreeMap;

/// Data-format identifier for this preprocessor.
pub const DATA_FORMAT_ID: u64 = 0;
pub const DATA_FORMAT_NAME: &str = "arm-cortex-m4";

/// A matching run shorter than this many address-keyed entries isn't
/// worth the block's own overhead: a run is accepted only once its
/// size (one less than its entry count) is at least 8.
const MIN_BLOCK_ENTRIES: usize = 9;

/// Address spans used both to classify pointer literals as
/// data/code-relative and to locate the data region to scan for them.
/// `from_*` fields ride on the wire; `to_*` fields are encode-only,
/// needed to disassemble `to` with its own (possibly different)
/// data/code layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanConfig {
    pub from_data_offset: u64,
    pub from_data_begin: u64,
    pub from_data_end: u64,
    pub from_code_begin: u64,
    pub from_code_end: u64,
    pub to_data_offset: u64,
    pub to_data_begin: u64,
    pub to_data_end: u64,
    pub to_code_begin: u64,
    pub to_code_end: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct DisassembleConfig {
    data_offset: u64,
    data_begin: u64,
    data_end: u64,
    code_begin: u64,
    code_end: u64,
}

/// Six address-keyed maps produced by [`disassemble`]. Stored as
/// `BTreeMap` so iteration is address-sorted for free, matching the
/// data model's "clients sort by address at use time" contract.
#[derive(Debug, Default, Clone)]
pub struct AnnotationMaps {
    pub bw: BTreeMap<u64, i64>,
    pub bl: BTreeMap<u64, i64>,
    pub ldr: BTreeMap<u64, i64>,
    pub ldr_w: BTreeMap<u64, i64>,
    pub data_pointers: BTreeMap<u64, i64>,
    pub code_pointers: BTreeMap<u64, i64>,
}

/// One accepted matching block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub from_offset: u64,
    pub to_address: u64,
    pub residuals: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockList(pub Vec<Block>);

impl BlockList {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        size::encode(self.0.len() as i64, &mut out);
        for b in &self.0 {
            size::encode(b.from_offset as i64, &mut out);
            size::encode(b.to_address as i64, &mut out);
            size::encode(b.residuals.len() as i64, &mut out);
            for &v in &b.residuals {
                size::encode(v, &mut out);
            }
        }
        out
    }

    /// Parses a block list from the front of `buf`, returning it with
    /// the number of bytes consumed.
    pub fn from_bytes(buf: &[u8]) -> Result<(Self, usize)> {
        let mut pos = 0usize;
        let (count, used) = size::decode(&buf[pos..])?;
        pos += used;

        let mut blocks = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count.max(0) {
            let (from_offset, u1) = size::decode(&buf[pos..])?;
            pos += u1;
            let (to_address, u2) = size::decode(&buf[pos..])?;
            pos += u2;
            let (value_count, u3) = size::decode(&buf[pos..])?;
            pos += u3;

            let mut residuals = Vec::with_capacity(value_count.max(0) as usize);
            for _ in 0..value_count.max(0) {
                let (v, u4) = size::decode(&buf[pos..])?;
                pos += u4;
                residuals.push(v);
            }

            blocks.push(Block {
                from_offset: from_offset as u64,
                to_address: to_address as u64,
                residuals,
            });
        }

        Ok((BlockList(blocks), pos))
    }
}

fn read_u16(image: &[u8], addr: u64) -> Result<u16> {
    let i = addr as usize;
    let bytes = image
        .get(i..i + 2)
        .ok_or_else(|| short_read(i + 2, image.len()))?;
    Ok(LE::read_u16(bytes))
}

fn read_u32(image: &[u8], addr: u64) -> Result<u32> {
    let i = addr as usize;
    let bytes = image
        .get(i..i + 4)
        .ok_or_else(|| short_read(i + 4, image.len()))?;
    Ok(LE::read_u32(bytes))
}

fn read_i32(image: &[u8], addr: u64) -> Result<i32> {
    let i = addr as usize;
    let bytes = image
        .get(i..i + 4)
        .ok_or_else(|| short_read(i + 4, image.len()))?;
    Ok(LE::read_i32(bytes))
}

fn short_read(expected: usize, got: usize) -> Error {
    Error::ShortRead { expected, got }
}

/// Walks `image` at byte granularity disassembling just enough
/// Thumb-2 to find PC-relative branch/load immediates and in-span
/// pointer literals.
fn disassemble(image: &[u8], cfg: &DisassembleConfig) -> Result<AnnotationMaps> {
    let len = image.len() as u64;
    let mut maps = AnnotationMaps::default();
    let data_span = cfg.data_end.saturating_sub(cfg.data_begin);
    let data_offset_end = cfg.data_offset + data_span;

    let mut cursor: u64 = 0;
    while cursor < len {
        let address = cursor;

        if cfg.data_offset <= address && address < data_offset_end {
            let value = read_u32(image, address)?;
            let v = u64::from(value);
            if cfg.data_begin <= v && v < cfg.data_end {
                maps.data_pointers.insert(address, value as i64);
            } else if cfg.code_begin <= v && v < cfg.code_end {
                maps.code_pointers.insert(address, value as i64);
            }
            cursor += 4;
            continue;
        }

        if maps.ldr.contains_key(&address) || maps.ldr_w.contains_key(&address) {
            cursor += 4;
            continue;
        }

        let upper = read_u16(image, address)?;

        if upper & 0xF800 == 0xF000 {
            let lower = read_u16(image, address + 2)?;
            if lower & 0xD000 == 0xD000 {
                maps.bl.insert(address, unpack_bl(upper, lower));
            } else if lower & 0xC000 == 0x8000 {
                maps.bw.insert(address, unpack_bw(upper, lower));
            }
            cursor += 4;
        } else if upper & 0xF800 == 0x4800 {
            let imm8 = 4 * u64::from(upper & 0xFF) + 4;
            let target = ldr_literal_address(address, imm8);
            let value = read_i32(image, target)?;
            maps.ldr.insert(target, i64::from(value));
            cursor += 2;
        } else if upper == 0xF8DF {
            let lower = read_u16(image, address + 2)?;
            let imm12 = u64::from(lower & 0xFFF) + 4;
            let target = ldr_literal_address(address, imm12);
            let value = read_i32(image, target)?;
            maps.ldr_w.insert(target, i64::from(value));
            cursor += 4;
        } else if matches!(upper & 0xFFF0, 0xFBB0 | 0xFB90 | 0xF8D0 | 0xF850)
            || upper & 0xFFE0 == 0xFA00
            || upper & 0xFFC0 == 0xE900
        {
            cursor += 4;
        } else {
            cursor += 2;
        }
    }

    Ok(maps)
}

/// A 16-bit LDR/LDR.W literal's pc-relative immediate is relative to
/// the instruction's own (word-aligned) address plus pipeline offset;
/// `imm` already folds in the `+4` pipeline adjustment.
fn ldr_literal_address(instruction_address: u64, imm: u64) -> u64 {
    let mut addr = instruction_address;
    if addr % 4 == 2 {
        addr -= 2;
    }
    addr + imm
}

/// Decodes a B.W target immediate from its two halfwords, using the
/// I1/I2/J1/J2 sign-folding trick.
pub fn unpack_bw(upper16: u16, lower16: u16) -> i64 {
    let upper = i64::from(upper16);
    let lower = i64::from(lower16);

    let s = (upper & 0x400) >> 10;
    let cond = (upper & 0x3c0) >> 6;
    let imm6 = upper & 0x3f;
    let imm11 = lower & 0x7ff;
    let j1 = (lower & 0x2000) >> 13;
    let t = (lower & 0x1000) >> 12;
    let j2 = (lower & 0x800) >> 11;

    let mut value = s << 24;
    value |= j2 << 23;
    value |= j1 << 22;
    value |= imm6 << 16;
    value |= imm11 << 5;
    value |= cond << 1;
    value |= t;

    if s == 1 {
        value -= 1 << 25;
    }

    value
}

/// Inverse of [`unpack_bw`], provided only so the pack/unpack
/// round-trip is checkable; never wired into the encode path, which
/// only ever unpacks.
pub fn pack_bw(value: i64) -> (u16, u16) {
    let mut value = value;
    if value < 0 {
        value += 1 << 25;
    }

    let t = value & 0x1;
    let cond = (value >> 1) & 0xf;
    let imm32 = value >> 5;
    let s = (imm32 >> 19) & 0x1;
    let j2 = (imm32 >> 18) & 0x1;
    let j1 = (imm32 >> 17) & 0x1;
    let imm6 = (imm32 >> 11) & 0x3f;
    let imm11 = imm32 & 0x7ff;

    let upper = (0b11110 << 11) | (s << 10) | (cond << 6) | imm6;
    let lower = (0b10 << 14) | (j1 << 13) | (t << 12) | (j2 << 11) | imm11;
    (upper as u16, lower as u16)
}

/// Decodes a BL target immediate from its two halfwords.
pub fn unpack_bl(upper16: u16, lower16: u16) -> i64 {
    let upper = i64::from(upper16);
    let lower = i64::from(lower16);

    let s = (upper & 0x400) >> 10;
    let imm10 = upper & 0x3ff;
    let imm11 = lower & 0x7ff;
    let j1 = (lower & 0x2000) >> 13;
    let j2 = (lower & 0x800) >> 11;
    let i1 = -((j1 ^ s) - 1);
    let i2 = -((j2 ^ s) - 1);

    let mut value = s << 23;
    value |= i1 << 22;
    value |= i2 << 21;
    value |= imm10 << 11;
    value |= imm11;

    if s == 1 {
        value -= 1 << 24;
    }

    value
}

/// Inverse of [`unpack_bl`]; same round-trip-only role as [`pack_bw`].
pub fn pack_bl(value: i64) -> (u16, u16) {
    let mut imm32 = value;
    if imm32 < 0 {
        imm32 += 1 << 24;
    }

    let s = (imm32 >> 23) & 0x1;
    let i1 = (imm32 >> 22) & 0x1;
    let i2 = (imm32 >> 21) & 0x1;
    let j1 = -((i1 ^ s) - 1);
    let j2 = -((i2 ^ s) - 1);
    let imm10 = (imm32 >> 11) & 0x3ff;
    let imm11 = imm32 & 0x7ff;

    let upper = (0b11110 << 11) | (s << 10) | imm10;
    let lower = (0b11 << 14) | (j1 << 13) | (0b1 << 12) | (j2 << 11) | imm11;
    (upper as u16, lower as u16)
}

fn zero_word(buf: &mut [u8], addr: u64) {
    let i = addr as usize;
    if let Some(slice) = buf.get_mut(i..i + 4) {
        slice.fill(0);
    }
}

/// Builds the matching-block list for one annotation category,
/// zeroing the matched 4-byte words in both scratch buffers so the
/// later bsdiff pass doesn't also encode them.
fn create_patch_block(
    from_buf: &mut [u8],
    to_buf: &mut [u8],
    from_map: &BTreeMap<u64, i64>,
    to_map: &BTreeMap<u64, i64>,
) -> BlockList {
    let from_addrs: Vec<u64> = from_map.keys().copied().collect();
    let to_addrs: Vec<u64> = to_map.keys().copied().collect();
    let from_vals: Vec<i64> = from_map.values().copied().collect();
    let to_vals: Vec<i64> = to_map.values().copied().collect();

    let mut blocks = Vec::new();
    for (from_offset, to_offset, len) in lcs::matching_blocks(&from_addrs, &to_addrs) {
        if len < MIN_BLOCK_ENTRIES {
            continue;
        }

        let residuals: Vec<i64> = (0..len)
            .map(|i| from_vals[from_offset + i] - to_vals[to_offset + i])
            .collect();
        blocks.push(Block {
            from_offset: from_offset as u64,
            to_address: to_addrs[to_offset],
            residuals,
        });

        for i in 0..len {
            let addr = from_addrs[from_offset + i];
            zero_word(from_buf, addr);
            zero_word(to_buf, addr);
        }
    }

    BlockList(blocks)
}

/// Runs the full preprocessor over `from`/`to` (mutated in place to
/// zero matched fields) and returns the data-format payload bytes.
pub fn encode(from: &mut [u8], to: &mut [u8], cfg: &SpanConfig) -> Result<Vec<u8>> {
    let from_cfg = DisassembleConfig {
        data_offset: cfg.from_data_offset,
        data_begin: cfg.from_data_begin,
        data_end: cfg.from_data_end,
        code_begin: cfg.from_code_begin,
        code_end: cfg.from_code_end,
    };
    let to_cfg = DisassembleConfig {
        data_offset: cfg.to_data_offset,
        data_begin: cfg.to_data_begin,
        data_end: cfg.to_data_end,
        code_begin: cfg.to_code_begin,
        code_end: cfg.to_code_end,
    };

    let from_maps = disassemble(from, &from_cfg)?;
    let to_maps = disassemble(to, &to_cfg)?;

    let mut patch = Vec::new();

    if cfg.from_data_end == 0 {
        patch.push(0);
    } else {
        patch.push(1);
        size::encode(cfg.from_data_offset as i64, &mut patch);
        size::encode(cfg.from_data_begin as i64, &mut patch);
        size::encode(cfg.from_data_end as i64, &mut patch);
        let blocks = create_patch_block(from, to, &from_maps.data_pointers, &to_maps.data_pointers);
        patch.extend(blocks.to_bytes());
    }

    if cfg.from_code_end == 0 {
        patch.push(0);
    } else {
        patch.push(1);
        size::encode(cfg.from_code_begin as i64, &mut patch);
        size::encode(cfg.from_code_end as i64, &mut patch);
        let blocks = create_patch_block(from, to, &from_maps.code_pointers, &to_maps.code_pointers);
        patch.extend(blocks.to_bytes());
    }

    patch.extend(create_patch_block(from, to, &from_maps.bw, &to_maps.bw).to_bytes());
    patch.extend(create_patch_block(from, to, &from_maps.bl, &to_maps.bl).to_bytes());
    patch.extend(create_patch_block(from, to, &from_maps.ldr, &to_maps.ldr).to_bytes());
    patch.extend(create_patch_block(from, to, &from_maps.ldr_w, &to_maps.ldr_w).to_bytes());

    log::debug!(
        "cortex-m4: bw={} bl={} ldr={} ldr_w={} data_pointers={} code_pointers={}",
        from_maps.bw.len(),
        from_maps.bl.len(),
        from_maps.ldr.len(),
        from_maps.ldr_w.len(),
        from_maps.data_pointers.len(),
        from_maps.code_pointers.len(),
    );

    Ok(patch)
}
