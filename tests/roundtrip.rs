//! Round-trip correctness against the test-only reference decoder --
//! decoding `encode(from, to, settings)` against `from` yields exactly
//! `to` -- plus determinism and in-place validation.

mod common;

use common::{compression_kinds, decode_in_place, decode_normal};
use detools::{encode_in_place, encode_normal, CompressionKind, EncoderOptions, InPlaceOptions};
use quickcheck_macros::quickcheck;

fn roundtrip_normal(from: &[u8], to: &[u8], kind: CompressionKind) {
    let patch = encode_normal(from, to, kind, None, &EncoderOptions::default()).unwrap();
    let got = decode_normal(&patch, from);
    assert_eq!(got, to, "kind={:?}", kind);
}

#[test]
fn identical_inputs_round_trip() {
    let data = b"the quick brown fox jumps over the lazy dog".to_vec();
    for kind in compression_kinds() {
        roundtrip_normal(&data, &data, kind);
    }
}

#[test]
fn empty_to_round_trips() {
    let from = b"abcdefgh".to_vec();
    for kind in compression_kinds() {
        roundtrip_normal(&from, &[], kind);
    }
}

#[test]
fn empty_from_round_trips() {
    let to = b"freshly written firmware".to_vec();
    for kind in compression_kinds() {
        roundtrip_normal(&[], &to, kind);
    }
}

#[test]
fn both_empty_round_trips() {
    for kind in compression_kinds() {
        roundtrip_normal(&[], &[], kind);
    }
}

#[test]
fn to_much_larger_than_from_round_trips() {
    let from = b"seed".to_vec();
    let mut to = Vec::new();
    for i in 0..20_000u32 {
        to.extend_from_slice(&i.to_le_bytes());
    }
    for kind in compression_kinds() {
        roundtrip_normal(&from, &to, kind);
    }
}

#[test]
fn small_local_edit_round_trips() {
    let from: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let mut to = from.clone();
    for b in to[1000..1064].iter_mut() {
        *b = !*b;
    }
    for kind in compression_kinds() {
        roundtrip_normal(&from, &to, kind);
    }
}

#[quickcheck]
fn random_pairs_round_trip(from: Vec<u8>, to: Vec<u8>) -> bool {
    let patch = encode_normal(&from, &to, CompressionKind::None, None, &EncoderOptions::default()).unwrap();
    decode_normal(&patch, &from) == to
}

#[test]
fn encoding_is_deterministic() {
    let from: Vec<u8> = (0..2048u32).map(|i| (i * 17 % 256) as u8).collect();
    let mut to = from.clone();
    to.truncate(1500);
    to.extend_from_slice(b"appended tail bytes for good measure");

    for kind in compression_kinds() {
        let p1 = encode_normal(&from, &to, kind, None, &EncoderOptions::default()).unwrap();
        let p2 = encode_normal(&from, &to, kind, None, &EncoderOptions::default()).unwrap();
        assert_eq!(p1, p2, "kind={:?}", kind);
    }
}

#[test]
fn in_place_round_trips_with_growth() {
    let from: Vec<u8> = (0..3000u32).map(|i| (i % 256) as u8).collect();
    let mut to: Vec<u8> = from.clone();
    to.extend(vec![0xAAu8; 200]);
    for b in to[500..560].iter_mut() {
        *b = 0x42;
    }

    let plan = InPlaceOptions::new(4096, 256);
    for kind in compression_kinds() {
        let patch = encode_in_place(&from, &to, kind, None, &plan, &EncoderOptions::default()).unwrap();
        let got = decode_in_place(&patch, &from);
        assert_eq!(got, to, "kind={:?}", kind);
    }
}

#[test]
fn in_place_round_trips_empty_to() {
    let from = vec![1u8, 2, 3, 4];
    let plan = InPlaceOptions::new(1024, 256);
    let patch = encode_in_place(&from, &[], CompressionKind::None, None, &plan, &EncoderOptions::default()).unwrap();
    assert_eq!(decode_in_place(&patch, &from), Vec::<u8>::new());
}

#[test]
fn in_place_rejects_misaligned_segment_size() {
    let from = vec![0u8; 1024];
    let to = vec![1u8; 1024];
    let plan = InPlaceOptions::new(1024, 300);
    let err = encode_in_place(&from, &to, CompressionKind::None, None, &plan, &EncoderOptions::default())
        .unwrap_err();
    assert!(matches!(err, detools::Error::BadAlignment { .. }));
}

#[quickcheck]
fn in_place_random_round_trips(seed: u8) -> bool {
    let base_len = 1000 + (seed as usize) * 17;
    let from: Vec<u8> = (0..base_len as u32).map(|i| (i % 200) as u8).collect();
    let mut to = from.clone();
    to.truncate(base_len.saturating_sub(50).max(1));
    to.extend(vec![seed; 80]);

    let plan = InPlaceOptions::new(4096, 256);
    let patch = match encode_in_place(&from, &to, CompressionKind::None, None, &plan, &EncoderOptions::default()) {
        Ok(p) => p,
        Err(_) => return true,
    };
    decode_in_place(&patch, &from) == to
}
