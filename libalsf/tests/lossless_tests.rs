//! Whole-stream encoder and decoder tests
use libalsf_audio::{AlsfError, Decoder, Encoder, EncoderConfig, Reader};

struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
}

fn sine(len: usize, channels: usize) -> Vec<f32> {
    (0..len * channels)
        .map(|i| {
            let t = (i / channels) as f32 / 48000.0;
            let phase = (i % channels) as f32 * 0.5;
            (2.0 * std::f32::consts::PI * 440.0 * t + phase).sin() * 0.7
        })
        .collect()
}

fn roundtrip(samples: &[f32], channels: u8, config: EncoderConfig) -> Vec<u8> {
    let encoder = Encoder::new(48000, channels, config).expect("bad config");
    let data = encoder.encode(samples, &[]).expect("encoding failed");
    let decoded = Decoder::new().decode(&data).expect("decoding failed");
    assert_eq!(decoded.len(), samples.len());
    for (i, (a, b)) in samples.iter().zip(&decoded).enumerate() {
        assert_eq!(a.to_bits(), b.to_bits(), "sample {i}");
    }
    data
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_mono_sine() {
    roundtrip(&sine(10_000, 1), 1, EncoderConfig::default());
}

#[test]
fn test_stereo_sine_small_frames() {
    let config = EncoderConfig::default().with_frame_size(333);
    roundtrip(&sine(5_000, 2), 2, config);
}

#[test]
fn test_pcm_sourced_floats_compress() {
    // 16-bit PCM scaled to floats, the common case
    let mut rng = XorShift(31337);
    let mut level = 0i32;
    let samples: Vec<f32> = (0..48_000)
        .map(|_| {
            level = (level + (rng.next() % 201) as i32 - 100).clamp(-32768, 32767);
            level as f32 / 32768.0
        })
        .collect();

    let data = roundtrip(&samples, 1, EncoderConfig::default());
    assert!(
        data.len() < samples.len() * 4 / 2,
        "{} bytes for {} samples",
        data.len(),
        samples.len()
    );
}

#[test]
fn test_decimal_steps_use_acf() {
    let samples: Vec<f32> = (0..8192).map(|i| ((i % 1000) as f32 - 500.0) * 0.1).collect();
    let with_acf = roundtrip(&samples, 1, EncoderConfig::default());
    let without = roundtrip(&samples, 1, EncoderConfig::default().with_acf(false));
    assert!(with_acf.len() < without.len());
}

#[test]
fn test_arbitrary_bit_patterns() {
    let mut rng = XorShift(0xFEED_FACE);
    let samples: Vec<f32> = (0..6000).map(|_| f32::from_bits(rng.next() as u32)).collect();
    roundtrip(&samples, 3, EncoderConfig::default().with_frame_size(1000));
}

#[test]
fn test_every_config_knob() {
    let samples = sine(3000, 2);
    let configs = [
        EncoderConfig::default().with_int_resolution(16),
        EncoderConfig::default().with_predictor_order(0),
        EncoderConfig::default().with_predictor_order(4),
        EncoderConfig::default().with_compression(false),
        EncoderConfig::default().with_random_access_interval(0),
        EncoderConfig::default()
            .with_frame_size(1)
            .with_random_access_interval(1),
    ];
    for config in configs {
        roundtrip(&samples[..600], 2, config);
    }
}

#[test]
fn test_silence() {
    let data = roundtrip(&vec![0.0f32; 20_000], 2, EncoderConfig::default());
    let file = Reader::new().read(&data).unwrap();
    assert!(file.frames.iter().all(|f| f.channels.iter().all(|c| c.is_silent())));
}

#[test]
fn test_empty_stream() {
    let encoder = Encoder::new(44100, 2, EncoderConfig::default()).unwrap();
    let data = encoder.encode(&[], &[]).unwrap();
    assert!(Decoder::new().decode(&data).unwrap().is_empty());
}

#[test]
fn test_partial_last_frame() {
    let config = EncoderConfig::default().with_frame_size(1024);
    let data = roundtrip(&sine(2500, 1), 1, config);
    let file = Reader::new().read(&data).unwrap();
    let sizes: Vec<u32> = file.frames.iter().map(|f| f.frame_samples).collect();
    assert_eq!(sizes, vec![1024, 1024, 452]);
}

// ============================================================================
// Seeking
// ============================================================================

#[test]
fn test_decode_from_random_access_frame() {
    let samples = sine(20 * 256, 1);
    let config = EncoderConfig::default()
        .with_frame_size(256)
        .with_random_access_interval(4);
    let data = Encoder::new(48000, 1, config).unwrap().encode(&samples, &[]).unwrap();
    let file = Reader::new().read(&data).unwrap();
    let decoder = Decoder::new();

    for frame in [0, 3, 4, 9, 19] {
        let decoded = decoder.decode_from(&file, frame).unwrap();
        let expected = &samples[frame * 256..];
        assert_eq!(decoded.len(), expected.len(), "frame {frame}");
        assert!(decoded
            .iter()
            .zip(expected)
            .all(|(a, b)| a.to_bits() == b.to_bits()));
    }

    assert!(decoder.decode_from(&file, 20).is_err());
}

#[test]
fn test_toc_marks_random_access_frames() {
    let config = EncoderConfig::default()
        .with_frame_size(100)
        .with_random_access_interval(3);
    let data = Encoder::new(48000, 1, config)
        .unwrap()
        .encode(&sine(1000, 1), &[])
        .unwrap();
    let file = Reader::new().read(&data).unwrap();

    let flags: Vec<bool> = file.toc.iter().map(|e| e.random_access).collect();
    assert_eq!(
        flags,
        vec![true, false, false, true, false, false, true, false, false, true]
    );
    let offsets: Vec<u64> = file.toc.iter().map(|e| e.sample_offset).collect();
    assert_eq!(offsets, (0..10).map(|i| i * 100).collect::<Vec<u64>>());
}

// ============================================================================
// Misuse
// ============================================================================

#[test]
fn test_config_rejected_before_encoding() {
    assert!(matches!(
        Encoder::new(48000, 0, EncoderConfig::default()),
        Err(AlsfError::InvalidConfig(_))
    ));
    assert!(matches!(
        Encoder::new(48000, 1, EncoderConfig::default().with_frame_size(0)),
        Err(AlsfError::InvalidConfig(_))
    ));
    assert!(matches!(
        Encoder::new(48000, 1, EncoderConfig::default().with_int_resolution(32)),
        Err(AlsfError::InvalidConfig(_))
    ));
}

#[test]
fn test_ragged_interleaving() {
    let encoder = Encoder::new(48000, 2, EncoderConfig::default()).unwrap();
    assert!(matches!(
        encoder.encode(&[0.1, 0.2, 0.3], &[]),
        Err(AlsfError::InvalidInput(_))
    ));
}
