//! In-place segment planner: slices `to` into fixed-size segments and
//! computes a forward-safe shift so a decoder can apply the patch into
//! the same flash region it is updating.

use crate::bsdiff::EncoderOptions;
use crate::container;
use crate::cortex_m4::SpanConfig;
use crate::data_format::DataFormat;
use crate::error::{Error, Result};
use crate::size;

/// Caller-supplied in-place planning knobs.
///
/// `minimum_shift_size` defaults to `2 * segment_size` -- a safety
/// margin not derived from first principles, but kept as the default
/// and documented as tunable via
/// [`InPlaceOptions::minimum_shift_size`].
#[derive(Debug, Clone, Copy)]
pub struct InPlaceOptions {
    pub memory_size: u64,
    pub segment_size: u64,
    minimum_shift_size: Option<u64>,
}

impl InPlaceOptions {
    pub fn new(memory_size: u64, segment_size: u64) -> Self {
        InPlaceOptions {
            memory_size,
            segment_size,
            minimum_shift_size: None,
        }
    }

    pub fn minimum_shift_size(mut self, value: u64) -> Self {
        self.minimum_shift_size = Some(value);
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedParams {
    pub memory_size: u64,
    pub segment_size: u64,
    pub shift_size: u64,
}

fn div_ceil(n: u64, d: u64) -> u64 {
    (n + d - 1) / d
}

/// Validates alignment preconditions and computes the shift:
/// `shift_size = max(minimum_shift_size, (ceil(memory_size /
/// segment_size) - ceil(from_size / segment_size)) * segment_size)`.
pub(crate) fn resolve(opts: &InPlaceOptions, from_size: u64) -> Result<ResolvedParams> {
    let memory_size = opts.memory_size;
    let segment_size = opts.segment_size;

    if segment_size == 0 || memory_size % segment_size != 0 {
        return Err(Error::bad_alignment("memory_size", memory_size, segment_size.max(1)));
    }

    let minimum_shift_size = opts.minimum_shift_size.unwrap_or(2 * segment_size);
    if minimum_shift_size % segment_size != 0 {
        return Err(Error::bad_alignment("minimum_shift_size", minimum_shift_size, segment_size));
    }

    let memory_segments = div_ceil(memory_size, segment_size);
    let from_segments = div_ceil(from_size, segment_size);
    let shift_segments = memory_segments.saturating_sub(from_segments);
    let shift_size = (shift_segments * segment_size).max(minimum_shift_size);

    Ok(ResolvedParams { memory_size, segment_size, shift_size })
}

/// Wraps one segment's inner body with its own `to_seg` size field,
/// the same shape as a normal patch body produced with no
/// compression.
fn encode_segment_body(
    from_seg: &[u8],
    to_seg: &[u8],
    data_format: Option<&DataFormat>,
    opts: &EncoderOptions,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    size::encode(to_seg.len() as i64, &mut out);
    out.extend(container::encode_inner(from_seg, to_seg, data_format, opts)?);
    Ok(out)
}

/// Per-segment data-format: same preprocessor, but with every
/// address/offset span zeroed. A configured `SpanConfig` is keyed to
/// whole-image addresses, which no longer line up once `from`/`to` are
/// sliced into segment-local buffers, so pointer classification is
/// disabled per segment by zeroing every span; BW/BL/LDR disassembly
/// still runs, but finds no data/code pointers since the zeroed
/// `data_begin == data_end == 0` and `code_begin == code_end == 0`
/// ranges are empty.
fn zero_spans(data_format: Option<&DataFormat>) -> Option<DataFormat> {
    data_format.map(|df| match df {
        DataFormat::ArmCortexM4(_) => DataFormat::ArmCortexM4(SpanConfig::default()),
    })
}

/// Builds the concatenated per-segment bodies for the whole `to`
/// image.
pub(crate) fn build_segments(
    params: &ResolvedParams,
    from: &[u8],
    to: &[u8],
    data_format: Option<&DataFormat>,
    opts: &EncoderOptions,
) -> Result<Vec<u8>> {
    let shifted_len = (params.memory_size.saturating_sub(params.shift_size) as usize).min(from.len());
    let shifted_from = &from[..shifted_len];

    let segment_size = params.segment_size as usize;
    let num_segments = div_ceil(to.len() as u64, params.segment_size) as usize;

    log::debug!(
        "in-place: {} segments of {} bytes, shift={} bytes",
        num_segments,
        segment_size,
        params.shift_size
    );

    let segment_data_format = zero_spans(data_format);

    let mut out = Vec::new();
    for k in 0..num_segments {
        let to_start = k * segment_size;
        let to_end = (to_start + segment_size).min(to.len());
        let to_seg = &to[to_start..to_end];

        let from_cut = (k as u64) * params.segment_size + params.segment_size;
        let from_offset = (from_cut.saturating_sub(params.shift_size) as usize).min(shifted_from.len());
        let from_seg = &shifted_from[from_offset..];

        out.extend(encode_segment_body(from_seg, to_seg, segment_data_format.as_ref(), opts)?);
    }

    Ok(out)
}
