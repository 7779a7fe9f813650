use anyhow::{Context, Result};
use std::io::{Cursor, Write};
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, SampleBuffer, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey, Value};
use symphonia::core::probe::Hint;

/// Tags and provenance picked up while reading a source file
#[derive(Debug, Default, Clone)]
pub struct SourceTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub comment: Option<String>,
    // e.g. "FLAC", "WAV"
    pub source_format: Option<String>,
    pub original_filename: Option<String>,
}

/// Decoded source audio, samples interleaved
#[derive(Debug, Clone)]
pub struct SourceAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
    pub tags: SourceTags,
}

impl SourceAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.channels == 0 || self.sample_rate == 0 {
            return 0.0;
        }
        (self.samples.len() / self.channels) as f64 / self.sample_rate as f64
    }
}

/// Read an audio file from disk.
pub fn read_audio_file(path: &Path) -> Result<SourceAudio> {
    let file = std::fs::File::open(path).context("Failed to open audio file")?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut audio = read_from_source(mss, path.extension().and_then(|e| e.to_str()))?;
    audio.tags.original_filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string);
    Ok(audio)
}

/// Read audio from bytes already in memory.
pub fn read_audio_from_bytes(bytes: &[u8]) -> Result<SourceAudio> {
    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());
    read_from_source(mss, None)
}

fn read_from_source(mss: MediaSourceStream, extension: Option<&str>) -> Result<SourceAudio> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let meta_opts = MetadataOptions {
        limit_metadata_bytes: symphonia::core::meta::Limit::Maximum(1024 * 1024),
        limit_visual_bytes: symphonia::core::meta::Limit::Maximum(0),
    };

    let mut probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &meta_opts)
        .context("Unsupported audio format")?;

    let mut format = probed.format;

    let mut tags = SourceTags {
        source_format: extension.map(|ext| ext.to_uppercase()),
        ..Default::default()
    };

    if let Some(meta_rev) = probed.metadata.get() {
        if let Some(current) = meta_rev.current() {
            extract_tags(current, &mut tags);
        }
    }
    if let Some(meta_rev) = format.metadata().current() {
        extract_tags(meta_rev, &mut tags);
    }

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found")?;

    if tags.source_format.is_none() {
        tags.source_format = Some(codec_name(track.codec_params.codec).to_string());
    }

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Unknown sample rate")?;
    let channels = track
        .codec_params
        .channels
        .context("Unknown channel count")?
        .count();

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(e) => return Err(e).context("Error reading packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                tracing::warn!("skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e).context("Error decoding packet"),
        };

        append_samples(decoded, &mut samples, channels);
    }

    tracing::info!(
        sample_rate,
        channels,
        samples = samples.len(),
        "source decoded"
    );

    Ok(SourceAudio {
        samples,
        sample_rate,
        channels,
        tags,
    })
}

fn codec_name(codec: symphonia::core::codecs::CodecType) -> &'static str {
    use symphonia::core::codecs::*;
    match codec {
        CODEC_TYPE_FLAC => "FLAC",
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE | CODEC_TYPE_PCM_S24LE
        | CODEC_TYPE_PCM_S32LE | CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F64LE => "WAV",
        CODEC_TYPE_MP3 => "MP3",
        CODEC_TYPE_VORBIS => "OGG",
        CODEC_TYPE_AAC => "AAC",
        _ => "UNKNOWN",
    }
}

fn extract_tags(meta: &MetadataRevision, tags: &mut SourceTags) {
    for tag in meta.tags() {
        let Some(std_key) = tag.std_key else {
            continue;
        };
        let value = match &tag.value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        };
        match std_key {
            StandardTagKey::TrackTitle => tags.title = value,
            StandardTagKey::Artist => tags.artist = value,
            StandardTagKey::Comment => tags.comment = value,
            _ => {}
        }
    }
}

/// Interleave a decoded buffer into `samples`.
///
/// Float sources are copied bit for bit and integer PCM is scaled by a power
/// of two, so 8/16/24-bit input maps to exact floats. Anything else goes
/// through symphonia's own conversion.
fn append_samples(buffer: AudioBufferRef, samples: &mut Vec<f32>, channels: usize) {
    match buffer {
        AudioBufferRef::F32(buf) => {
            for frame in 0..buf.frames() {
                for ch in 0..channels {
                    samples.push(buf.chan(ch)[frame]);
                }
            }
        }
        AudioBufferRef::S16(buf) => {
            let scale = 1.0 / 32768.0;
            for frame in 0..buf.frames() {
                for ch in 0..channels {
                    samples.push(buf.chan(ch)[frame] as f32 * scale);
                }
            }
        }
        AudioBufferRef::S24(buf) => {
            let scale = 1.0 / 8388608.0;
            for frame in 0..buf.frames() {
                for ch in 0..channels {
                    samples.push(buf.chan(ch)[frame].inner() as f32 * scale);
                }
            }
        }
        AudioBufferRef::U8(buf) => {
            for frame in 0..buf.frames() {
                for ch in 0..channels {
                    samples.push((buf.chan(ch)[frame] as f32 - 128.0) / 128.0);
                }
            }
        }
        other => {
            let spec = *other.spec();
            let mut converted = SampleBuffer::<f32>::new(other.capacity() as u64, spec);
            converted.copy_interleaved_ref(other);
            samples.extend_from_slice(converted.samples());
        }
    }
}

/// Write samples to a 32-bit IEEE float WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: usize) -> Result<()> {
    let bytes = write_wav_to_bytes(samples, sample_rate, channels)?;
    std::fs::write(path, bytes).context("Failed to write WAV file")
}

/// 32-bit IEEE float WAV in memory. Sample bits are written untouched, so
/// NaN payloads and signed zeros survive.
pub fn write_wav_to_bytes(samples: &[f32], sample_rate: u32, channels: usize) -> Result<Vec<u8>> {
    let bytes_per_sample = 4usize;
    let data_size = u32::try_from(samples.len() * bytes_per_sample)
        .ok()
        .filter(|&size| size <= u32::MAX - 36)
        .context("Too many samples for a WAV file")?;
    let channel_count = u16::try_from(channels).context("Too many channels for a WAV file")?;

    let mut buffer = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buffer.write_all(b"RIFF")?;
    buffer.write_all(&(36 + data_size).to_le_bytes())?;
    buffer.write_all(b"WAVE")?;

    // fmt chunk
    buffer.write_all(b"fmt ")?;
    buffer.write_all(&16u32.to_le_bytes())?;
    buffer.write_all(&3u16.to_le_bytes())?; // format = IEEE float
    buffer.write_all(&channel_count.to_le_bytes())?;
    buffer.write_all(&sample_rate.to_le_bytes())?;
    let byte_rate = sample_rate * channels as u32 * bytes_per_sample as u32;
    buffer.write_all(&byte_rate.to_le_bytes())?;
    let block_align = channel_count * bytes_per_sample as u16;
    buffer.write_all(&block_align.to_le_bytes())?;
    buffer.write_all(&32u16.to_le_bytes())?;

    // data chunk
    buffer.write_all(b"data")?;
    buffer.write_all(&data_size.to_le_bytes())?;
    for &sample in samples {
        buffer.write_all(&sample.to_bits().to_le_bytes())?;
    }

    Ok(buffer)
}
