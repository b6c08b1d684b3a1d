//! bsdiff encoder: turns a suffix array of `from` plus both buffers
//! into the interleaved control/diff/extra byte stream.

use crate::size;

/// Default threshold of mismatched bytes tolerated while bridging two
/// exact matches into one.
pub const DISMATCH_COUNT: usize = 8;

/// Single bsdiff control triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    /// Bytes simultaneously copied from `from` and diffed byte-wise.
    pub copy_len: u64,
    /// Literal bytes that follow, taken verbatim from `to`.
    pub extra_len: u64,
    /// Signed adjustment applied to the `from` cursor before the next triple.
    pub seek_adjust: i64,
}

/// Knobs shared by the bsdiff search.
#[derive(Debug, Clone, Copy)]
pub struct EncoderOptions {
    pub dismatch_count: usize,
    pub buffer_size: usize,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        EncoderOptions {
            dismatch_count: DISMATCH_COUNT,
            buffer_size: crate::BUFFER_SIZE,
        }
    }
}

impl EncoderOptions {
    pub fn dismatch_count(mut self, dis: usize) -> Self {
        self.dismatch_count = Ord::max(dis, 1);
        self
    }

    pub fn buffer_size(mut self, bs: usize) -> Self {
        self.buffer_size = Ord::max(bs, 128);
        self
    }
}

/// Encodes the bsdiff control/diff/extra stream for `to` relative to
/// `from`, using `sa` (the suffix array of `from`) for matching.
///
/// Always ends with one trailing all-zero `(0, 0, 0)` triple so a
/// decoder knows where the stream stops; any all-zero triple the
/// search happens to yield along the way is dropped rather than
/// written, since it carries no copy/extra bytes and would otherwise
/// be indistinguishable from the real terminator.
pub fn encode(sa: &[u32], from: &[u8], to: &[u8], opts: &EncoderOptions) -> Vec<u8> {
    let mut out = Vec::new();
    let mut n_controls = 0usize;

    for (c, spos, tpos) in Search::new(from, to, sa, opts.dismatch_count) {
        if c.copy_len == 0 && c.extra_len == 0 && c.seek_adjust == 0 {
            continue;
        }
        n_controls += 1;

        size::encode(c.copy_len as i64, &mut out);
        size::encode(c.extra_len as i64, &mut out);
        size::encode(c.seek_adjust, &mut out);

        let copy_len = c.copy_len as usize;
        if copy_len > 0 {
            for k in 0..copy_len {
                let y = to[tpos + k];
                let x = from.get(spos + k).copied().unwrap_or(0);
                out.push(y.wrapping_sub(x));
            }
        }

        let extra_len = c.extra_len as usize;
        if extra_len > 0 {
            out.extend_from_slice(&to[tpos + copy_len..tpos + copy_len + extra_len]);
        }
    }

    size::encode(0, &mut out);
    size::encode(0, &mut out);
    size::encode(0, &mut out);

    log::debug!(
        "bsdiff: emitted {} control triples over {} bytes of `to`",
        n_controls,
        to.len()
    );
    out
}

/// bsdiff search context: walks `to` left to right, tracking the
/// previous approximate-match state, and yields `(Control, spos,
/// tpos)` triples where `spos`/`tpos` are the `from`/`to` cursors
/// *before* this control's copy/extra region, so callers can slice
/// out diff and literal bytes directly.
struct Search<'s, 't> {
    s: &'s [u8],
    t: &'t [u8],
    sa: &'s [u32],
    dismat: usize,

    i0: usize,
    j0: usize,
    n0: usize,
    b0: usize,

    spos: usize,
    tpos: usize,
}

impl<'s, 't> Search<'s, 't> {
    fn new(s: &'s [u8], t: &'t [u8], sa: &'s [u32], dismat: usize) -> Self {
        Search {
            s,
            t,
            sa,
            dismat,
            i0: 0,
            j0: 0,
            n0: 0,
            b0: 0,
            spos: 0,
            tpos: 0,
        }
    }

    fn search_next(&self) -> Option<(usize, usize, usize)> {
        if self.j0 == self.t.len() && self.b0 == 0 {
            return None;
        }

        let mut j = self.j0 + self.n0;
        let mut k = j;
        let mut m = 0usize;
        while j < self.t.len() {
            let (i, n) = search_lcp(self.sa, self.s, &self.t[j..]);

            while k < j + n {
                let si = self.i0.saturating_add(k - self.j0);
                if si < self.s.len() && self.s[si] == self.t[k] {
                    m += 1;
                }
                k += 1;
            }

            if m == n && n != 0 {
                m = 0;
                j += n;
                continue;
            } else if n <= m + self.dismat {
                if j < k {
                    let si = self.i0.saturating_add(j - self.j0);
                    if si < self.s.len() && self.s[si] == self.t[j] {
                        m -= 1;
                    }
                    j += 1;
                } else {
                    j += 1;
                    k = j;
                    m = 0;
                }
                continue;
            } else {
                return Some((i, j, n));
            }
        }

        Some((self.s.len(), self.t.len(), 0))
    }

    fn shrink_gap(&self, i: usize, j: usize) -> (usize, usize) {
        let gap = &self.t[self.j0 + self.n0..j];
        let suffix = &self.s[self.i0 + self.n0..];
        let prefix = &self.s[..i];

        let mut a0 = scan_similar(gap.iter(), suffix.iter());
        let mut b = scan_similar(gap.iter().rev(), prefix.iter().rev());

        if a0 + b > gap.len() {
            let n = a0 + b - gap.len();
            let xs = gap[gap.len() - b..a0].iter();
            let ys = suffix[gap.len() - b..a0].iter();
            let zs = prefix[prefix.len() - b..prefix.len() - b + n].iter();

            let i = scan_divide(xs, ys, zs);
            a0 = a0 - n + i;
            b -= i;
        }

        (a0, b)
    }
}

impl<'s, 't> Iterator for Search<'s, 't> {
    type Item = (Control, usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (i, j, n) = self.search_next()?;
        let (i0, j0, n0, b0) = (self.i0, self.j0, self.n0, self.b0);
        let (a0, b) = self.shrink_gap(i, j);

        // source:
        //     ...(   b0   ,   n0   ,   a0   )...(   b   ,...
        //        ^ spos    ^ i0                ^         ^ i
        // target:
        //     ...(   b0   ,   n0   ,   a0   ;   copy   )(   b   ,...
        //        ^ tpos    ^ j0              ^ tpos+add         ^ j
        let copy_len = (b0 + n0 + a0) as u64;
        let extra_len = ((j - b) - (j0 + n0 + a0)) as u64;
        let seek_adjust = (i - b).wrapping_sub(i0 + n0 + a0) as isize as i64;

        let spos = self.spos;
        let tpos = self.tpos;

        self.tpos += (copy_len + extra_len) as usize;
        let advanced = (copy_len as i64).wrapping_add(seek_adjust);
        self.spos = (self.spos as i64).wrapping_add(advanced) as usize;

        self.i0 = i;
        self.j0 = j;
        self.n0 = n;
        self.b0 = b;

        Some((
            Control {
                copy_len,
                extra_len,
                seek_adjust,
            },
            spos,
            tpos,
        ))
    }
}

/// Scans for the data length of maximum similarity.
fn scan_similar<T: Eq, I: Iterator<Item = T>>(xs: I, ys: I) -> usize {
    let mut i = 0;
    let mut matched = 0isize;
    let mut max_score = 0isize;

    for (n, eq) in (1..).zip(xs.zip(ys).map(|(x, y)| x == y)) {
        matched += isize::from(eq);
        let score = 2 * matched - n as isize;
        if score > max_score {
            i = n;
            max_score = score;
        }
    }

    i
}

/// Scans for the dividing point of an overlap.
fn scan_divide<T: Eq, I: Iterator<Item = T>>(xs: I, ys: I, zs: I) -> usize {
    let mut i = 0;
    let mut y_matched = 0isize;
    let mut z_matched = 0isize;
    let mut max_score = 0isize;

    let eqs = xs.zip(ys).zip(zs).map(|((x, y), z)| (x == y, x == z));
    for (n, (y_eq, z_eq)) in (1..).zip(eqs) {
        y_matched += isize::from(y_eq);
        z_matched += isize::from(z_eq);
        let score = y_matched - z_matched;
        if score > max_score {
            i = n;
            max_score = score;
        }
    }

    i
}

/// Binary searches `sa` (suffix array of `s`) for the suffix with the
/// longest common prefix with `pattern`. Returns `(from_position,
/// lcp_length)`; `from_position == s.len()` with length `0` when `s`
/// or `pattern` is empty.
fn search_lcp(sa: &[u32], s: &[u8], pattern: &[u8]) -> (usize, usize) {
    if sa.is_empty() || pattern.is_empty() {
        return (s.len(), 0);
    }

    let pos = sa.partition_point(|&i| s[i as usize..] < *pattern);

    let mut best_len = 0usize;
    let mut best_pos = s.len();
    for idx in [pos.checked_sub(1), Some(pos)].into_iter().flatten() {
        if idx < sa.len() {
            let from_pos = sa[idx] as usize;
            let l = common_prefix_len(&s[from_pos..], pattern);
            if l > best_len {
                best_len = l;
                best_pos = from_pos;
            }
        }
    }

    (best_pos, best_len)
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    Iterator::zip(a.iter(), b.iter())
        .take_while(|(x, y)| x == y)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_encodes_single_full_copy() {
        let from = b"ABCD".to_vec();
        let to = from.clone();
        let sa = crate::sais::build(&from);
        let stream = encode(&sa, &from, &to, &EncoderOptions::default());

        // se(4) se(0) se(0) + 4 zero diff bytes + se(0) se(0) se(0) terminator
        let mut expected = Vec::new();
        size::encode(4, &mut expected);
        size::encode(0, &mut expected);
        size::encode(0, &mut expected);
        expected.extend([0u8; 4]);
        size::encode(0, &mut expected);
        size::encode(0, &mut expected);
        size::encode(0, &mut expected);
        assert_eq!(stream, expected);
    }

    #[test]
    fn pure_literal_when_from_is_empty() {
        let from: Vec<u8> = Vec::new();
        let to = b"ABC".to_vec();
        let sa = crate::sais::build(&from);
        let stream = encode(&sa, &from, &to, &EncoderOptions::default());

        let mut expected = Vec::new();
        size::encode(0, &mut expected);
        size::encode(3, &mut expected);
        size::encode(0, &mut expected);
        expected.extend(b"ABC");
        size::encode(0, &mut expected);
        size::encode(0, &mut expected);
        size::encode(0, &mut expected);
        assert_eq!(stream, expected);
    }

    #[test]
    fn empty_to_is_just_terminator() {
        let from = b"abc".to_vec();
        let to: Vec<u8> = Vec::new();
        let sa = crate::sais::build(&from);
        let stream = encode(&sa, &from, &to, &EncoderOptions::default());

        let mut expected = Vec::new();
        size::encode(0, &mut expected);
        size::encode(0, &mut expected);
        size::encode(0, &mut expected);
        assert_eq!(stream, expected);
    }
}
