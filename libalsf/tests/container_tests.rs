//! ALSF container reader/writer tests
use libalsf_audio::core::{data_digest, HEADER_SIZE, TOC_ENTRY_SIZE};
use libalsf_audio::{
    read_metadata, stream_info, AlsfError, Encoder, EncoderConfig, Reader, StreamMetadata, MAGIC,
    VERSION_MAJOR,
};

fn sample_stream(metadata: &[u8]) -> (Vec<f32>, Vec<u8>) {
    let samples: Vec<f32> = (0..4000).map(|i| (i as f32 * 0.02).sin() * 0.5).collect();
    let config = EncoderConfig::default().with_frame_size(512);
    let data = Encoder::new(44100, 2, config)
        .unwrap()
        .encode(&samples, metadata)
        .unwrap();
    (samples, data)
}

// ============================================================================
// Layout
// ============================================================================

#[test]
fn test_header_fields() {
    let (_, data) = sample_stream(&[]);
    assert_eq!(&data[..4], &MAGIC);

    let header = Reader::new().read_header_only(&data).unwrap();
    assert_eq!(header.version_major, VERSION_MAJOR);
    assert_eq!(header.sample_rate, 44100);
    assert_eq!(header.channels, 2);
    assert_eq!(header.int_resolution, 24);
    assert_eq!(header.frame_size, 512);
    assert_eq!(header.random_access_interval, 10);
    assert_eq!(header.total_samples, 2000);
    assert_eq!(header.toc_size, 4 + 4 * TOC_ENTRY_SIZE);
    assert_eq!(header.meta_size, 0);
    assert_eq!(
        data.len() as u64,
        4 + HEADER_SIZE + header.toc_size + header.data_size
    );
}

#[test]
fn test_digest_covers_the_data_chunk() {
    let (_, data) = sample_stream(&[]);
    let file = Reader::new().validate(&data).unwrap();
    let start = file.header.data_offset();
    let end = start + file.header.data_size as usize;
    assert_eq!(data_digest(&data[start..end]), file.header.data_digest);
}

#[test]
fn test_toc_offsets_chain() {
    let (_, data) = sample_stream(&[]);
    let file = Reader::new().read(&data).unwrap();
    let mut offset = 0u64;
    for (entry, frame) in file.toc.iter().zip(&file.frames) {
        assert_eq!(entry.byte_offset, offset);
        assert_eq!(entry.frame_size as usize, frame.byte_size());
        offset += entry.frame_size as u64;
    }
    assert_eq!(offset, file.header.data_size);
}

// ============================================================================
// Metadata
// ============================================================================

#[test]
fn test_metadata_chunk() {
    let meta = StreamMetadata {
        comment: Some("captured at 32-bit float".to_string()),
        ..StreamMetadata::with_basic(Some("Take 3".to_string()), None)
    };
    let (_, data) = sample_stream(&meta.to_msgpack().unwrap());

    let back = read_metadata(&data).unwrap().unwrap();
    assert_eq!(back, meta);

    let (_, plain) = sample_stream(&[]);
    assert!(read_metadata(&plain).unwrap().is_none());
}

#[test]
fn test_stream_info() {
    let (_, data) = sample_stream(&[]);
    let info = stream_info(&data).unwrap();
    assert_eq!(info.version(), "1.0");
    assert_eq!(info.frame_count, 4);
    assert_eq!(info.total_samples, 2000);
    assert!(info.digest_valid);
    assert!((info.duration_secs - 2000.0 / 44100.0).abs() < 1e-9);
    assert!(info.compression_ratio > 1.0);
}

// ============================================================================
// Corruption
// ============================================================================

#[test]
fn test_bad_magic() {
    let (_, mut data) = sample_stream(&[]);
    data[0] = b'X';
    assert!(matches!(
        Reader::new().read(&data),
        Err(AlsfError::InvalidHeader(_))
    ));
}

#[test]
fn test_truncated_stream() {
    let (_, data) = sample_stream(&[]);
    for cut in [0, 3, 20, 90, data.len() / 2, data.len() - 1] {
        assert!(Reader::new().read(&data[..cut]).is_err(), "cut at {cut}");
    }
}

#[test]
fn test_flipped_data_bit_fails_digest() {
    let (_, mut data) = sample_stream(&[]);
    let last = data.len() - 1;
    data[last] ^= 0x01;
    assert!(matches!(
        Reader::new().validate(&data),
        Err(AlsfError::DigestMismatch)
    ));
    assert!(!stream_info(&data).unwrap().digest_valid);
}

#[test]
fn test_oversized_chunk_sizes() {
    let (_, mut data) = sample_stream(&[]);
    // data_size sits 64 bytes into the header
    let at = 4 + 64;
    data[at..at + 8].copy_from_slice(&u64::MAX.to_le_bytes());
    assert!(matches!(
        Reader::new().read(&data),
        Err(AlsfError::InvalidHeader(_))
    ));
}

#[test]
fn test_overflowing_toc_offset() {
    let (_, mut data) = sample_stream(&[]);
    // first entry: count(4) then frame_index(4) then byte_offset
    let at = 4 + HEADER_SIZE as usize + 4 + 4;
    data[at..at + 8].copy_from_slice(&u64::MAX.to_le_bytes());
    assert!(matches!(
        Reader::new().read(&data),
        Err(AlsfError::InvalidHeader(_))
    ));
    assert!(Reader::new().validate(&data).is_err());
}
