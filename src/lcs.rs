//! Longest-common-substring block matching over two address sequences.
//!
//! This is the classic `difflib.SequenceMatcher.get_matching_blocks`
//! construction: repeatedly find the longest run of literally-equal
//! elements between the two remaining ranges, accept it, then recurse
//! left and right of the match. A `HashMap` index of `b`'s values
//! keeps each longest-match search close to linear in practice.

use std::collections::HashMap;

/// Returns non-overlapping `(a_offset, b_offset, len)` triples, sorted
/// by `a_offset`, such that `a[a_offset..a_offset+len] ==
/// b[b_offset..b_offset+len]` for every triple. Adjacent triples that
/// turn out to be contiguous in both sequences are merged.
pub fn matching_blocks(a: &[u64], b: &[u64]) -> Vec<(usize, usize, usize)> {
    let mut b_index: HashMap<u64, Vec<usize>> = HashMap::new();
    for (j, &v) in b.iter().enumerate() {
        b_index.entry(v).or_default().push(j);
    }

    let mut raw = Vec::new();
    let mut queue = vec![(0usize, a.len(), 0usize, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        if alo >= ahi || blo >= bhi {
            continue;
        }
        if let Some((ai, bj, size)) = longest_match(a, &b_index, alo, ahi, blo, bhi) {
            raw.push((ai, bj, size));
            if alo < ai && blo < bj {
                queue.push((alo, ai, blo, bj));
            }
            if ai + size < ahi && bj + size < bhi {
                queue.push((ai + size, ahi, bj + size, bhi));
            }
        }
    }

    raw.sort_unstable_by_key(|&(ai, _, _)| ai);
    merge_adjacent(raw)
}

fn longest_match(
    a: &[u64],
    b_index: &HashMap<u64, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> Option<(usize, usize, usize)> {
    let mut best: Option<(usize, usize, usize)> = None;
    // `run_at[j]` is the length of the match ending at b-index `j`
    // that was extended from the previous a-index.
    let mut run_at: HashMap<usize, usize> = HashMap::new();

    for i in alo..ahi {
        let mut new_run: HashMap<usize, usize> = HashMap::new();
        if let Some(js) = b_index.get(&a[i]) {
            for &j in js {
                if j < blo || j >= bhi {
                    continue;
                }
                let prev = if j > 0 { run_at.get(&(j - 1)).copied().unwrap_or(0) } else { 0 };
                let run = prev + 1;
                new_run.insert(j, run);
                let better = match best {
                    None => true,
                    Some((_, _, best_len)) => run > best_len,
                };
                if better {
                    best = Some((i + 1 - run, j + 1 - run, run));
                }
            }
        }
        run_at = new_run;
    }

    best
}

fn merge_adjacent(blocks: Vec<(usize, usize, usize)>) -> Vec<(usize, usize, usize)> {
    let mut out: Vec<(usize, usize, usize)> = Vec::with_capacity(blocks.len());
    for (a, b, len) in blocks {
        if let Some(last) = out.last_mut() {
            if last.0 + last.2 == a && last.1 + last.2 == b {
                last.2 += len;
                continue;
            }
        }
        out.push((a, b, len));
    }
    out
}
