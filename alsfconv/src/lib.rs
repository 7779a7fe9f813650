//! alsfconv - audio format converter library
//!
//! Reads anything symphonia understands, encodes it to the ALSF lossless
//! float container and writes decoded streams back out as 32-bit float WAV.

pub mod audio;

use std::path::Path;

use anyhow::{Context, Result};
use libalsf_audio::{AcfMode, Decoder, Encoder, EncoderConfig, Reader};

pub use audio::{SourceAudio, SourceTags};
pub use libalsf_audio::StreamMetadata;

/// Information about an ALSF stream
#[derive(Debug, Clone, serde::Serialize)]
pub struct AlsfInfo {
    pub version: String,
    pub sample_rate: u32,
    pub channels: u8,
    pub int_resolution: u8,
    pub frame_size: u32,
    pub total_samples: u64,
    pub frame_count: usize,
    pub duration_secs: f64,
    pub file_size: usize,
    pub compression_ratio: f64,
    pub digest_valid: bool,
    pub metadata: Option<StreamMetadata>,
}

/// Get information about an ALSF stream
pub fn get_alsf_info(data: &[u8]) -> Result<AlsfInfo> {
    let info = libalsf_audio::stream_info(data).context("Failed to read ALSF stream")?;
    let metadata = get_metadata(data)?;

    Ok(AlsfInfo {
        version: info.version(),
        sample_rate: info.sample_rate,
        channels: info.channels,
        int_resolution: info.int_resolution,
        frame_size: info.frame_size,
        total_samples: info.total_samples,
        frame_count: info.frame_count,
        duration_secs: info.duration_secs,
        file_size: info.file_size,
        compression_ratio: info.compression_ratio,
        digest_valid: info.digest_valid,
        metadata,
    })
}

/// Full structural check plus digest verification.
pub fn validate_alsf(data: &[u8]) -> Result<()> {
    Reader::new()
        .validate(data)
        .map(|_| ())
        .context("ALSF validation failed")
}

/// Encoding options for converting audio to ALSF
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub config: EncoderConfig,
    /// Replaces whatever tags the source carried
    pub metadata: Option<StreamMetadata>,
}

impl EncodeOptions {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            metadata: None,
        }
    }

    /// Set metadata to embed in the file
    pub fn with_metadata(mut self, metadata: StreamMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Load an `EncoderConfig` from a JSON file. Missing fields keep their defaults.
pub fn load_config(path: &Path) -> Result<EncoderConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn describe_config(config: &EncoderConfig) -> String {
    let acf = match (config.use_acf, config.acf_mode) {
        (false, _) => "off",
        (true, AcfMode::Strict) => "strict",
        (true, AcfMode::ResidualAllowed) => "relaxed",
    };
    format!(
        "frame {}, int {} bit, acf {}, ra every {}",
        config.frame_size, config.int_resolution, acf, config.random_access_interval
    )
}

/// Encode audio file bytes (WAV, FLAC, MP3, OGG, ...) to ALSF.
pub fn encode_from_audio(audio_bytes: &[u8], options: EncodeOptions) -> Result<Vec<u8>> {
    let source = audio::read_audio_from_bytes(audio_bytes).context("Failed to read audio file")?;
    encode_source(&source, options)
}

/// Encode an audio file on disk to ALSF.
pub fn encode_file(input: &Path, options: EncodeOptions) -> Result<Vec<u8>> {
    let source = audio::read_audio_file(input).context("Failed to read audio file")?;
    encode_source(&source, options)
}

pub fn encode_source(source: &SourceAudio, options: EncodeOptions) -> Result<Vec<u8>> {
    encode_from_samples(
        &source.samples,
        source.sample_rate,
        source.channels,
        source.tags.clone(),
        options,
    )
}

/// Encode interleaved samples to ALSF.
///
/// Encoder name, settings and the time of encoding are always recorded in
/// the metadata chunk, on top of the source tags or `options.metadata`.
pub fn encode_from_samples(
    samples: &[f32],
    sample_rate: u32,
    channels: usize,
    source_tags: SourceTags,
    options: EncodeOptions,
) -> Result<Vec<u8>> {
    let channels = u8::try_from(channels)
        .with_context(|| format!("{} channels do not fit the container", channels))?;

    let mut meta = options.metadata.unwrap_or_else(|| StreamMetadata {
        title: source_tags.title,
        artist: source_tags.artist,
        comment: source_tags.comment,
        ..Default::default()
    });

    meta.encoder = Some(format!("alsfconv {}", env!("CARGO_PKG_VERSION")));
    meta.encoder_settings = Some(describe_config(&options.config));
    meta.encoding_time = Some(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
    meta.source_format = source_tags.source_format.or(meta.source_format);
    meta.original_filename = source_tags.original_filename.or(meta.original_filename);

    let metadata_bytes = meta
        .to_msgpack()
        .context("Failed to serialize metadata")?;

    let encoder = Encoder::new(sample_rate, channels, options.config)
        .context("Invalid encoder configuration")?;
    let encoded = encoder
        .encode(samples, &metadata_bytes)
        .context("Encoding failed")?;

    tracing::info!(
        input_bytes = samples.len() * 4,
        output_bytes = encoded.len(),
        "encoded"
    );
    Ok(encoded)
}

/// Decode an ALSF stream to (interleaved samples, sample_rate, channels).
pub fn decode_to_samples(alsf_bytes: &[u8]) -> Result<(Vec<f32>, u32, usize)> {
    let file = Reader::new()
        .read(alsf_bytes)
        .context("Invalid ALSF stream")?;
    let samples = Decoder::new()
        .decode_file(&file)
        .context("Decoding failed")?;
    Ok((samples, file.header.sample_rate, file.header.channels as usize))
}

/// Decode an ALSF stream to 32-bit float WAV bytes.
pub fn decode_to_wav(alsf_bytes: &[u8]) -> Result<Vec<u8>> {
    let (samples, sample_rate, channels) = decode_to_samples(alsf_bytes)?;
    audio::write_wav_to_bytes(&samples, sample_rate, channels).context("Failed to write WAV data")
}

/// Metadata from an ALSF stream, if it carries any.
pub fn get_metadata(alsf_bytes: &[u8]) -> Result<Option<StreamMetadata>> {
    libalsf_audio::read_metadata(alsf_bytes).context("Invalid metadata")
}
