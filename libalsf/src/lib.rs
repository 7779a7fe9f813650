//! Lossless floating-point PCM coding.
//!
//! Float samples are split into an integer stream (optionally divided by a
//! common rational factor first) and a small bit-exact correction stream that
//! is squeezed with a masked LZ dictionary coder. The integers travel through
//! a fixed-predictor Rice layer and everything lands in a compact container.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod core;
pub mod error;
pub mod float;
pub mod lossless;
pub mod mlz;

mod reader;
mod writer;

pub use config::{AcfMode, DictionaryPolicy, EncoderConfig};
pub use core::{
    metadata::*, rice, AlsfFile, Header, BitReader, BitWriter, HEADER_SIZE, MAGIC, VERSION_MAJOR,
    VERSION_MINOR,
};
pub use error::{AlsfError, AlsfResult};
pub use float::{
    ChannelDecoder, ChannelEncodeResult, ChannelEncoder, ChannelFrameState, FloatFrame,
    FloatFrameDecoder, FloatFrameEncoder,
};
pub use lossless::{Decoder, Encoder};
pub use mlz::{MlzDecoder, MlzEncoder};
pub use reader::Reader;
pub use writer::Writer;

// stream info for the info() function

/// info about an alsf stream
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// version string like "1.0"
    #[wasm_bindgen(skip)]
    pub version: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u8,
    /// Integer resolution of the float engine
    pub int_resolution: u8,
    /// Samples per channel per frame
    pub frame_size: u32,
    /// Total samples per channel
    pub total_samples: u64,
    /// Number of coded frames
    pub frame_count: usize,
    /// Duration in seconds
    pub duration_secs: f64,
    /// Stream size in bytes
    pub file_size: usize,
    /// 32-bit float size over coded size
    pub compression_ratio: f64,
    /// Does the data chunk match its digest?
    pub digest_valid: bool,
}

#[wasm_bindgen]
impl StreamInfo {
    #[wasm_bindgen(getter)]
    pub fn version(&self) -> String {
        self.version.clone()
    }
}

// result helpers

/// turn an error into js
fn to_js_err(e: AlsfError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// api functions

/// encode interleaved float samples to alsf
///
/// # Arguments
/// * `samples` - Interleaved f32 samples, any values including NaN and infinities
/// * `sample_rate` - Sample rate in Hz (e.g., 48000)
/// * `channels` - Number of channels
/// * `frame_size` - Samples per channel per frame (0 for the default)
/// * `metadata` - Optional MessagePack metadata
///
/// # Note
/// For ACF mode, dictionary policy and the other knobs use `Encoder` with an
/// `EncoderConfig` directly.
#[wasm_bindgen]
pub fn encode(
    samples: &[f32],
    sample_rate: u32,
    channels: u8,
    frame_size: usize,
    metadata: Option<Vec<u8>>,
) -> Result<Vec<u8>, JsValue> {
    let mut config = EncoderConfig::default();
    if frame_size > 0 {
        config = config.with_frame_size(frame_size);
    }

    let encoder = Encoder::new(sample_rate, channels, config).map_err(to_js_err)?;
    encoder
        .encode(samples, &metadata.unwrap_or_default())
        .map_err(to_js_err)
}

/// decode an alsf stream to interleaved samples
#[wasm_bindgen]
pub fn decode(data: &[u8]) -> Result<Vec<f32>, JsValue> {
    Decoder::new().decode(data).map_err(to_js_err)
}

/// Validate stream integrity
///
/// # Returns
/// true if the stream parses and the data digest matches
#[wasm_bindgen]
pub fn validate(data: &[u8]) -> Result<bool, JsValue> {
    Ok(Reader::new().validate(data).is_ok())
}

/// Get information about an alsf stream
#[wasm_bindgen]
pub fn info(data: &[u8]) -> Result<StreamInfo, JsValue> {
    stream_info(data).map_err(to_js_err)
}

/// Same as `info`, for native callers.
pub fn stream_info(data: &[u8]) -> AlsfResult<StreamInfo> {
    let reader = Reader::new();
    let file = reader.read(data)?;
    let header = &file.header;

    let original_size = header.total_samples as f64 * header.channels as f64 * 4.0;
    let compression_ratio = if data.is_empty() {
        0.0
    } else {
        original_size / data.len() as f64
    };

    let start = header.data_offset();
    let end = start + header.data_size as usize;
    let digest_valid = core::data_digest(&data[start..end]) == header.data_digest;

    Ok(StreamInfo {
        version: format!("{}.{}", header.version_major, header.version_minor),
        sample_rate: header.sample_rate,
        channels: header.channels,
        int_resolution: header.int_resolution,
        frame_size: header.frame_size,
        total_samples: header.total_samples,
        frame_count: file.frames.len(),
        duration_secs: header.duration_secs(),
        file_size: data.len(),
        compression_ratio,
        digest_valid,
    })
}

/// get lib version
#[wasm_bindgen]
pub fn version() -> String {
    format!("{}.{}", VERSION_MAJOR, VERSION_MINOR)
}

/// Create metadata from basic fields and serialize to MessagePack
#[wasm_bindgen]
pub fn create_metadata(
    title: Option<String>,
    artist: Option<String>,
    comment: Option<String>,
) -> Result<Vec<u8>, JsValue> {
    let meta = StreamMetadata {
        comment,
        ..StreamMetadata::with_basic(title, artist)
    };
    meta.to_msgpack()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Create metadata from a JavaScript object
///
/// Accepts an object with any of the `StreamMetadata` fields.
#[wasm_bindgen]
pub fn create_metadata_from_object(obj: JsValue) -> Result<Vec<u8>, JsValue> {
    let meta: StreamMetadata = serde_wasm_bindgen::from_value(obj)
        .map_err(|e| JsValue::from_str(&format!("Invalid metadata: {}", e)))?;
    meta.to_msgpack()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Extract metadata from an alsf stream
///
/// # Returns
/// JavaScript object with metadata fields (or null if no metadata)
#[wasm_bindgen]
pub fn get_metadata(data: &[u8]) -> Result<JsValue, JsValue> {
    let reader = Reader::new();
    let file = reader.read(data).map_err(to_js_err)?;

    if file.metadata.is_empty() {
        return Ok(JsValue::NULL);
    }

    let meta = StreamMetadata::from_msgpack(&file.metadata)
        .map_err(|e| JsValue::from_str(&format!("Invalid metadata: {}", e)))?;

    serde_wasm_bindgen::to_value(&meta)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Parsed metadata of a stream, `None` when the stream carries none.
pub fn read_metadata(data: &[u8]) -> AlsfResult<Option<StreamMetadata>> {
    let file = Reader::new().read(data)?;
    if file.metadata.is_empty() {
        return Ok(None);
    }
    StreamMetadata::from_msgpack(&file.metadata)
        .map(Some)
        .map_err(|e| AlsfError::Metadata(e.to_string()))
}
