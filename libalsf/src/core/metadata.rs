//! Stream metadata
//!
//! Free-form descriptive fields carried in the META chunk.
//! Uses MessagePack serialization for efficiency and flexibility

use serde::{Deserialize, Serialize};

/// Descriptive information stored alongside the coded audio
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub comment: Option<String>,

    /// encoder name and version, e.g. "alsfconv 0.1.0"
    pub encoder: Option<String>,
    /// human readable encoder settings
    pub encoder_settings: Option<String>,
    /// ISO 8601 time of encoding
    pub encoding_time: Option<String>,
    /// format the samples were read from (WAV, FLAC, ...)
    pub source_format: Option<String>,
    pub original_filename: Option<String>,

    /// opaque application payload
    #[serde(with = "serde_bytes", default)]
    pub application_data: Vec<u8>,
}

impl StreamMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create metadata with basic fields
    pub fn with_basic(title: Option<String>, artist: Option<String>) -> Self {
        Self {
            title,
            artist,
            ..Default::default()
        }
    }

    /// Serialize to MessagePack bytes
    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }

    /// Deserialize from MessagePack bytes
    pub fn from_msgpack(data: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(data)
    }

    /// Check if metadata is empty (no significant fields set)
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.comment.is_none()
            && self.encoder.is_none()
            && self.encoder_settings.is_none()
            && self.encoding_time.is_none()
            && self.source_format.is_none()
            && self.original_filename.is_none()
            && self.application_data.is_empty()
    }
}
