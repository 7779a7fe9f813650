//! Metadata tests for libalsf

use libalsf_audio::{EncoderConfig, StreamMetadata};

// ============================================================================
// Basic Metadata Tests
// ============================================================================

#[test]
fn test_metadata_empty() {
    let meta = StreamMetadata::new();
    assert!(meta.is_empty());

    let packed = meta.to_msgpack().unwrap();
    assert!(packed.len() < 200, "Empty metadata should be small");
}

#[test]
fn test_metadata_basic_fields() {
    let meta = StreamMetadata::with_basic(Some("My Take".to_string()), Some("Me".to_string()));

    assert_eq!(meta.title, Some("My Take".to_string()));
    assert_eq!(meta.artist, Some("Me".to_string()));
    assert!(!meta.is_empty());
}

#[test]
fn test_metadata_roundtrip() {
    let mut meta = StreamMetadata::new();
    meta.title = Some("Room tone".to_string());
    meta.encoder = Some("alsfconv 0.1.0".to_string());
    meta.encoder_settings = Some("frame=2048 res=24 acf=strict".to_string());
    meta.encoding_time = Some("2026-01-01T00:00:00Z".to_string());
    meta.source_format = Some("WAV".to_string());
    meta.original_filename = Some("room.wav".to_string());
    meta.application_data = vec![0, 1, 2, 254, 255];

    let packed = meta.to_msgpack().unwrap();
    let unpacked = StreamMetadata::from_msgpack(&packed).unwrap();
    assert_eq!(unpacked, meta);
}

#[test]
fn test_application_data_alone_is_not_empty() {
    let meta = StreamMetadata {
        application_data: vec![42],
        ..Default::default()
    };
    assert!(!meta.is_empty());
}

#[test]
fn test_garbage_is_rejected() {
    assert!(StreamMetadata::from_msgpack(&[0xC1, 0x00, 0xFF]).is_err());
}

// ============================================================================
// Encoder settings serialization
// ============================================================================

#[test]
fn test_config_json_roundtrip() {
    let config = EncoderConfig::default()
        .with_frame_size(4096)
        .with_acf(false)
        .with_random_access_interval(0);
    let json = serde_json::to_string(&config).unwrap();
    let back: EncoderConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_config_json_partial() {
    let back: EncoderConfig =
        serde_json::from_str(r#"{"frame_size": 1024, "acf_mode": "residual_allowed"}"#).unwrap();
    assert_eq!(back.frame_size, 1024);
    assert_eq!(back.acf_mode, libalsf_audio::AcfMode::ResidualAllowed);
    assert_eq!(back.int_resolution, 24);
    assert_eq!(back.dictionary_policy, libalsf_audio::DictionaryPolicy::Flush);
}
