//! Masked-LZ dictionary compressor tests
use libalsf_audio::core::{BitReader, BitWriter};
use libalsf_audio::mlz::{symbol_mask, MlzDecoder, MlzEncoder, FIRST_CODE, MIN_CODE_BITS};
use libalsf_audio::{AlsfError, DictionaryPolicy};

// small deterministic generator, enough for test data
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn byte(&mut self) -> u8 {
        (self.next() >> 24) as u8
    }
}

fn encode(enc: &mut MlzEncoder, symbols: &[u8], widths: &[u8]) -> Vec<u8> {
    let mut out = BitWriter::new();
    enc.encode(symbols, widths, &mut out).expect("encode failed");
    out.into_bytes()
}

fn full_width(n: usize) -> Vec<u8> {
    vec![8u8; n]
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_repeating_pattern_compresses() {
    let symbols: Vec<u8> = [0x12u8, 0x34, 0x56].iter().copied().cycle().take(10_000).collect();
    let widths = full_width(symbols.len());

    let mut enc = MlzEncoder::new(DictionaryPolicy::Flush);
    let mut out = BitWriter::new();
    enc.encode(&symbols, &widths, &mut out).unwrap();
    let raw_bits = symbols.len() * 8;
    assert!(
        out.bit_len() * 10 < raw_bits,
        "{} bits for {raw_bits} raw",
        out.bit_len()
    );

    let bytes = out.into_bytes();
    let mut dec = MlzDecoder::new();
    let decoded = dec.decode(&mut BitReader::new(&bytes), symbols.len()).unwrap();
    assert_eq!(decoded, symbols);
    assert_eq!(dec.table(), enc.table());
}

#[test]
fn test_masked_symbols_roundtrip() {
    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
    let widths: Vec<u8> = (0..5000).map(|_| (rng.next() % 8) as u8 + 1).collect();
    // a small alphabet so strings repeat under the masks
    let symbols: Vec<u8> = (0..5000).map(|_| rng.byte() & 0xE3).collect();

    let mut enc = MlzEncoder::new(DictionaryPolicy::Flush);
    let bytes = encode(&mut enc, &symbols, &widths);

    let mut dec = MlzDecoder::new();
    let decoded = dec.decode(&mut BitReader::new(&bytes), symbols.len()).unwrap();
    for (i, ((&s, &d), &w)) in symbols.iter().zip(&decoded).zip(&widths).enumerate() {
        let mask = symbol_mask(w);
        assert_eq!(s & mask, d & mask, "symbol {i} width {w}");
    }
    assert_eq!(dec.table(), enc.table());
}

#[test]
fn test_state_carries_across_calls() {
    let chunk: Vec<u8> = b"the quick brown fox jumps over the lazy dog ".repeat(20);
    let widths = full_width(chunk.len());

    let mut enc = MlzEncoder::new(DictionaryPolicy::Flush);
    let first = encode(&mut enc, &chunk, &widths);
    let second = encode(&mut enc, &chunk, &widths);
    assert!(second.len() < first.len());

    let mut dec = MlzDecoder::new();
    assert_eq!(dec.decode(&mut BitReader::new(&first), chunk.len()).unwrap(), chunk);
    assert_eq!(dec.decode(&mut BitReader::new(&second), chunk.len()).unwrap(), chunk);
    assert_eq!(dec.table(), enc.table());
}

#[test]
fn test_table_fills_and_flushes() {
    let mut rng = XorShift(42);
    let symbols: Vec<u8> = (0..120_000).map(|_| rng.byte() & 0x3F).collect();
    let widths = full_width(symbols.len());

    let mut enc = MlzEncoder::new(DictionaryPolicy::Flush);
    let bytes = encode(&mut enc, &symbols, &widths);

    let mut dec = MlzDecoder::new();
    let decoded = dec.decode(&mut BitReader::new(&bytes), symbols.len()).unwrap();
    assert_eq!(decoded, symbols);
    assert_eq!(dec.table(), enc.table());
    assert!(!enc.table().is_frozen());
}

#[test]
fn test_freeze_policy_stops_growing() {
    let mut rng = XorShift(7);
    let symbols: Vec<u8> = (0..120_000).map(|_| rng.byte() & 0x3F).collect();
    let widths = full_width(symbols.len());

    let mut enc = MlzEncoder::new(DictionaryPolicy::Freeze);
    let bytes = encode(&mut enc, &symbols, &widths);
    assert!(enc.table().is_frozen());
    let frozen_len = enc.table().entries().len();

    let mut dec = MlzDecoder::new();
    let decoded = dec.decode(&mut BitReader::new(&bytes), symbols.len()).unwrap();
    assert_eq!(decoded, symbols);
    assert_eq!(dec.table(), enc.table());

    // more data, no more strings
    let tail = encode(&mut enc, &symbols[..1000], &widths[..1000]);
    assert_eq!(enc.table().entries().len(), frozen_len);
    let decoded = dec.decode(&mut BitReader::new(&tail), 1000).unwrap();
    assert_eq!(decoded, &symbols[..1000]);
}

// ============================================================================
// Backup / resume / flush
// ============================================================================

#[test]
fn test_resume_restores_the_table() {
    let warmup: Vec<u8> = b"abracadabra".repeat(30);
    let probe: Vec<u8> = b"cadabra abra kadabra".repeat(10);

    let mut enc = MlzEncoder::new(DictionaryPolicy::Flush);
    encode(&mut enc, &warmup, &full_width(warmup.len()));
    let before = enc.table().clone();

    enc.backup();
    let first = encode(&mut enc, &probe, &full_width(probe.len()));
    assert_ne!(enc.table(), &before);
    enc.resume();
    assert_eq!(enc.table(), &before);

    enc.backup();
    let second = encode(&mut enc, &probe, &full_width(probe.len()));
    enc.commit();
    assert_eq!(first, second);
}

#[test]
fn test_resume_across_a_flush() {
    let mut rng = XorShift(99);
    let warmup: Vec<u8> = (0..2000).map(|_| rng.byte()).collect();
    // long enough to fill the table at least once
    let probe: Vec<u8> = (0..200_000).map(|_| rng.byte() & 0x3F).collect();

    let mut enc = MlzEncoder::new(DictionaryPolicy::Flush);
    encode(&mut enc, &warmup, &full_width(warmup.len()));
    let before = enc.table().clone();

    enc.backup();
    let first = encode(&mut enc, &probe, &full_width(probe.len()));
    enc.resume();
    assert_eq!(enc.table(), &before);

    let second = encode(&mut enc, &probe, &full_width(probe.len()));
    assert_eq!(first, second);
}

#[test]
fn test_flush_is_deterministic() {
    let a: Vec<u8> = b"some earlier content that fills the table".repeat(8);
    let b: Vec<u8> = b"fresh start".repeat(16);

    let mut used = MlzEncoder::new(DictionaryPolicy::Flush);
    encode(&mut used, &a, &full_width(a.len()));
    used.flush();
    let after_flush = encode(&mut used, &b, &full_width(b.len()));

    let mut fresh = MlzEncoder::new(DictionaryPolicy::Flush);
    let from_scratch = encode(&mut fresh, &b, &full_width(b.len()));

    assert_eq!(after_flush, from_scratch);
    assert_eq!(used.table(), fresh.table());
}

#[test]
fn test_decoder_flush_matches_encoder_flush() {
    let a: Vec<u8> = b"xyzzy".repeat(50);
    let mut enc = MlzEncoder::new(DictionaryPolicy::Flush);
    let mut dec = MlzDecoder::new();

    let bytes = encode(&mut enc, &a, &full_width(a.len()));
    dec.decode(&mut BitReader::new(&bytes), a.len()).unwrap();
    assert!(dec.string_count() > 0);

    enc.flush();
    dec.flush();
    assert_eq!(dec.string_count(), 0);
    assert_eq!(dec.table(), enc.table());
    assert_eq!(enc.table().code_bits(), MIN_CODE_BITS);
    assert_eq!(enc.table().next_code(), FIRST_CODE);
}

// ============================================================================
// Corruption
// ============================================================================

#[test]
fn test_unknown_code_is_rejected() {
    let bytes = [0xFFu8; 4];
    let mut dec = MlzDecoder::new();
    let err = dec.decode(&mut BitReader::new(&bytes), 3).unwrap_err();
    assert!(matches!(
        err,
        AlsfError::InvalidCode {
            code: 511,
            next_code: FIRST_CODE
        }
    ));
}

#[test]
fn test_string_longer_than_partition() {
    let run = vec![b'a'; 100];
    let mut enc = MlzEncoder::new(DictionaryPolicy::Flush);
    let bytes = encode(&mut enc, &run, &full_width(run.len()));

    let mut dec = MlzDecoder::new();
    let err = dec.decode(&mut BitReader::new(&bytes), 50).unwrap_err();
    assert!(matches!(err, AlsfError::StringOverflow { .. }), "{err}");
}

#[test]
fn test_truncated_stream() {
    let data: Vec<u8> = b"truncate me please".to_vec();
    let mut enc = MlzEncoder::new(DictionaryPolicy::Flush);
    let bytes = encode(&mut enc, &data, &full_width(data.len()));

    let mut dec = MlzDecoder::new();
    let err = dec
        .decode(&mut BitReader::new(&bytes[..bytes.len() / 2]), data.len())
        .unwrap_err();
    assert!(matches!(err, AlsfError::UnexpectedEof));
}

#[test]
fn test_bad_widths_are_caller_errors() {
    let mut enc = MlzEncoder::new(DictionaryPolicy::Flush);
    let mut out = BitWriter::new();
    assert!(matches!(
        enc.encode(&[1, 2], &[8], &mut out),
        Err(AlsfError::InvalidInput(_))
    ));
    assert!(matches!(
        enc.encode(&[1], &[9], &mut out),
        Err(AlsfError::InvalidInput(_))
    ));
    assert_eq!(out.bit_len(), 0);
}
