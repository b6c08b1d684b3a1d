//! Suffix array construction by induced sorting (SA-IS).
//!
//! Linear-time, alphabet-size independent, and correct on arbitrary
//! (including highly repetitive) byte strings -- no quicksort
//! fallback, since the bsdiff encoder's asymptotic behaviour depends
//! on O(n) construction.
//!
//! This is the classic Nong/Zhang/Chen algorithm: classify suffixes as
//! S-type or L-type, bucket-sort the LMS suffixes approximately via
//! induced sorting, name the resulting LMS substrings, recurse on the
//! named string if names are not already unique, then induce the full
//! suffix array from the correctly-ordered LMS suffixes.

/// Max source length this builder will index (keeps suffix array
/// entries within `u32`, matching the realistic size of a firmware
/// image this crate targets).
pub const MAX_LENGTH: usize = u32::MAX as usize;

/// Builds the suffix array of `source`: a permutation of `0..source.len()`
/// such that the corresponding suffixes are lexicographically sorted.
///
/// Panics if `source.len() > MAX_LENGTH`.
pub fn build(source: &[u8]) -> Vec<u32> {
    let n = source.len();
    if n == 0 {
        return Vec::new();
    }
    assert!(n <= MAX_LENGTH, "source is too large to be indexed");

    // Shift bytes into 1..=256 and append a unique sentinel 0, so the
    // induced-sorting invariants (last character is S-type, unique
    // minimal terminator) hold without special-casing the real alphabet.
    let mut extended: Vec<i64> = Vec::with_capacity(n + 1);
    extended.extend(source.iter().map(|&b| i64::from(b) + 1));
    extended.push(0);

    let sa = sa_is(&extended, 257);

    sa.into_iter()
        .filter(|&x| x != n as i64)
        .map(|x| x as u32)
        .collect()
}

/// Recursive SA-IS core. `s` is a string over the integer alphabet
/// `0..alphabet_size`, with `s` itself carrying a unique minimal
/// terminal symbol at its end (required by the induced-sorting
/// invariants below).
fn sa_is(s: &[i64], alphabet_size: usize) -> Vec<i64> {
    let n = s.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![0];
    }

    let types = classify(s);
    let bucket_sizes = bucket_sizes(s, alphabet_size);

    // Pass 1: seed LMS suffixes into bucket tails, then induce the
    // rest; this sorts LMS *substrings* relative to each other, which
    // is enough to assign them stable names.
    let mut sa = place_lms(s, &types, &bucket_sizes, lms_positions(&types).into_iter());
    induce_l(&mut sa, s, &types, &bucket_sizes);
    induce_s(&mut sa, s, &types, &bucket_sizes);

    let lms_indices = lms_positions(&types);
    let (names, distinct) = name_lms_substrings(s, &types, &sa, &lms_indices);

    let order: Vec<i64> = if distinct == lms_indices.len() {
        // Names are already a permutation: read off LMS order directly.
        let mut summary_sa = vec![0i64; lms_indices.len()];
        for (i, &name) in names.iter().enumerate() {
            summary_sa[name as usize] = i as i64;
        }
        summary_sa
    } else {
        sa_is(&names, distinct)
    };

    // Pass 2: seed LMS suffixes in their now-correct relative order,
    // then induce the final full suffix array.
    let mut sa = place_lms(
        s,
        &types,
        &bucket_sizes,
        order.into_iter().rev().map(|i| lms_indices[i as usize]),
    );
    induce_l(&mut sa, s, &types, &bucket_sizes);
    induce_s(&mut sa, s, &types, &bucket_sizes);
    sa
}

/// `true` at index `i` iff suffix `i` is S-type (smaller than its
/// successor, or equal and the successor is S-type).
fn classify(s: &[i64]) -> Vec<bool> {
    let n = s.len();
    let mut t = vec![false; n];
    t[n - 1] = true;
    for i in (0..n - 1).rev() {
        t[i] = match s[i].cmp(&s[i + 1]) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => t[i + 1],
        };
    }
    t
}

#[inline]
fn is_lms(i: usize, t: &[bool]) -> bool {
    i > 0 && t[i] && !t[i - 1]
}

fn lms_positions(t: &[bool]) -> Vec<usize> {
    (0..t.len()).filter(|&i| is_lms(i, t)).collect()
}

fn bucket_sizes(s: &[i64], alphabet_size: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; alphabet_size];
    for &c in s {
        sizes[c as usize] += 1;
    }
    sizes
}

fn bucket_heads(sizes: &[usize]) -> Vec<usize> {
    let mut heads = vec![0usize; sizes.len()];
    let mut sum = 0;
    for (i, &size) in sizes.iter().enumerate() {
        heads[i] = sum;
        sum += size;
    }
    heads
}

fn bucket_tails(sizes: &[usize]) -> Vec<usize> {
    let mut tails = vec![0usize; sizes.len()];
    let mut sum = 0;
    for (i, &size) in sizes.iter().enumerate() {
        sum += size;
        tails[i] = sum.wrapping_sub(1);
    }
    tails
}

/// Places LMS positions (given in the desired final relative order,
/// back to front) into bucket tails, leaving everything else empty
/// (`-1`) for the induce passes to fill in.
fn place_lms(
    s: &[i64],
    _types: &[bool],
    bucket_sizes: &[usize],
    lms_in_order_rev: impl Iterator<Item = usize>,
) -> Vec<i64> {
    let n = s.len();
    let mut sa = vec![-1i64; n];
    let mut tails = bucket_tails(bucket_sizes);
    for i in lms_in_order_rev {
        let c = s[i] as usize;
        sa[tails[c]] = i as i64;
        tails[c] = tails[c].wrapping_sub(1);
    }
    sa
}

/// Induces all L-type suffixes from whatever is already placed in `sa`
/// (the LMS suffixes), scanning left to right.
fn induce_l(sa: &mut [i64], s: &[i64], t: &[bool], bucket_sizes: &[usize]) {
    let mut heads = bucket_heads(bucket_sizes);
    for i in 0..sa.len() {
        if sa[i] <= 0 {
            continue;
        }
        let j = (sa[i] - 1) as usize;
        if !t[j] {
            let c = s[j] as usize;
            sa[heads[c]] = j as i64;
            heads[c] += 1;
        }
    }
}

/// Induces all S-type suffixes, scanning right to left.
fn induce_s(sa: &mut [i64], s: &[i64], t: &[bool], bucket_sizes: &[usize]) {
    let mut tails = bucket_tails(bucket_sizes);
    for i in (0..sa.len()).rev() {
        if sa[i] <= 0 {
            continue;
        }
        let j = (sa[i] - 1) as usize;
        if t[j] {
            let c = s[j] as usize;
            sa[tails[c]] = j as i64;
            tails[c] = tails[c].wrapping_sub(1);
        }
    }
}

/// Assigns each LMS position a name: two LMS substrings share a name
/// iff they are byte-for-byte (and type-for-type) identical. Returns
/// the per-LMS-index (in original string order) name array and the
/// number of distinct names assigned.
fn name_lms_substrings(
    s: &[i64],
    t: &[bool],
    sa: &[i64],
    lms_indices: &[usize],
) -> (Vec<i64>, usize) {
    let n = s.len();
    let mut names = vec![-1i64; n];
    let mut name = -1i64;
    let mut prev: Option<usize> = None;

    for &pos in sa.iter() {
        let pos = pos as usize;
        if !is_lms(pos, t) {
            continue;
        }

        let mut differs = true;
        if let Some(p) = prev {
            differs = !lms_substrings_equal(s, t, p, pos);
        }
        if differs {
            name += 1;
        }
        prev = Some(pos);
        names[pos] = name;
    }

    let distinct = (name + 1) as usize;
    let summary: Vec<i64> = lms_indices.iter().map(|&i| names[i]).collect();
    (summary, distinct)
}

/// Byte-and-type comparison of the two LMS substrings starting at `a`
/// and `b` (inclusive of their own position, up to and including the
/// next LMS position).
fn lms_substrings_equal(s: &[i64], t: &[bool], a: usize, b: usize) -> bool {
    let n = s.len();
    let mut d = 0usize;
    loop {
        let ia = a + d;
        let ib = b + d;
        let a_end = ia >= n;
        let b_end = ib >= n;
        if a_end != b_end {
            return false;
        }
        if a_end && b_end {
            return true;
        }
        if s[ia] != s[ib] || t[ia] != t[ib] {
            return false;
        }
        if d > 0 && is_lms(ia, t) && is_lms(ib, t) {
            return true;
        }
        d += 1;
    }
}
