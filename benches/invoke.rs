/*! Benchmarking patch generation via invoking this `detools` crate. */

use criterion::{criterion_group, criterion_main, Criterion};
use detools::{encode_normal, CompressionKind, EncoderOptions};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time;

/// Builds a `from`/`to` pair that looks like a small firmware update:
/// mostly shared bytes with a handful of shifted/patched regions.
fn firmware_like_sample(seed: u64, size: usize) -> (Vec<u8>, Vec<u8>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let from: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
    let mut to = from.clone();

    let edits = size / 4096;
    for _ in 0..edits {
        let at = rng.gen_range(0, size.saturating_sub(64).max(1));
        for b in to[at..(at + 64).min(size)].iter_mut() {
            *b = rng.gen();
        }
    }
    (from, to)
}

pub fn diff(crit: &mut Criterion) {
    for &size in &[16 * 1024usize, 256 * 1024, 1024 * 1024] {
        let (from, to) = firmware_like_sample(size as u64, size);
        let bench_name = format!("encode_normal {} bytes", size);
        crit.bench_function(&bench_name, |b| {
            b.iter(|| {
                encode_normal(&from, &to, CompressionKind::None, None, &EncoderOptions::default())
                    .unwrap()
            })
        });
    }
}

criterion_group! {
    name = diff_benches;
    config = Criterion::default()
        .sample_size(10)
        .noise_threshold(0.02)
        .warm_up_time(time::Duration::from_millis(200))
        .measurement_time(time::Duration::new(5, 0));
    targets = diff,
}

criterion_main!(diff_benches);
