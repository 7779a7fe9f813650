//! Encoder configuration
//!
//! Everything the format cannot represent is rejected here, before the first
//! frame is encoded.

use serde::{Deserialize, Serialize};

use crate::error::{AlsfError, AlsfResult};

/// Largest frame the shift histogram and partition buffers are sized for.
pub const MAX_FRAME_SIZE: usize = 65536;

/// Integer resolution bounds (bits per quantized sample).
pub const MIN_INT_RESOLUTION: u8 = 16;
pub const MAX_INT_RESOLUTION: u8 = 24;

/// Highest fixed predictor order the integer layer knows.
pub const MAX_PREDICTOR_ORDER: u8 = 4;

/// How strictly a common-factor candidate has to reproduce the samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AcfMode {
    /// Every sample must come back bit-exact through the multiplier.
    #[default]
    Strict,
    /// Small mismatches are allowed and carried in the residual.
    ResidualAllowed,
}

/// What the dictionary does once all 2^15 codes are in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DictionaryPolicy {
    /// Clear the table and start over.
    #[default]
    Flush,
    /// Keep the table and stop adding entries.
    Freeze,
}

/// Stream-wide encoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// samples per channel per frame
    pub frame_size: usize,
    /// bits per quantized integer sample
    pub int_resolution: u8,
    /// search for a common multiplier per channel
    pub use_acf: bool,
    pub acf_mode: AcfMode,
    /// frames between random-access points (0 = only the first frame)
    pub random_access_interval: u16,
    /// highest fixed predictor order tried for the integers
    pub max_predictor_order: u8,
    /// try the dictionary coder on residual partitions
    pub compress_residuals: bool,
    pub dictionary_policy: DictionaryPolicy,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            frame_size: 2048,
            int_resolution: 24,
            use_acf: true,
            acf_mode: AcfMode::Strict,
            random_access_interval: 10,
            max_predictor_order: 2,
            compress_residuals: true,
            dictionary_policy: DictionaryPolicy::Flush,
        }
    }
}

impl EncoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn with_int_resolution(mut self, bits: u8) -> Self {
        self.int_resolution = bits;
        self
    }

    pub fn with_acf(mut self, enabled: bool) -> Self {
        self.use_acf = enabled;
        self
    }

    pub fn with_acf_mode(mut self, mode: AcfMode) -> Self {
        self.acf_mode = mode;
        self
    }

    pub fn with_random_access_interval(mut self, frames: u16) -> Self {
        self.random_access_interval = frames;
        self
    }

    pub fn with_predictor_order(mut self, order: u8) -> Self {
        self.max_predictor_order = order.min(MAX_PREDICTOR_ORDER);
        self
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress_residuals = enabled;
        self
    }

    pub fn with_dictionary_policy(mut self, policy: DictionaryPolicy) -> Self {
        self.dictionary_policy = policy;
        self
    }

    /// Check every limit the bitstream depends on.
    pub fn validate(&self, channels: usize) -> AlsfResult<()> {
        if channels == 0 || channels > u8::MAX as usize {
            return Err(AlsfError::InvalidConfig(format!(
                "channel count {channels} outside 1..=255"
            )));
        }
        if self.frame_size == 0 || self.frame_size > MAX_FRAME_SIZE {
            return Err(AlsfError::InvalidConfig(format!(
                "frame size {} outside 1..={MAX_FRAME_SIZE}",
                self.frame_size
            )));
        }
        if !(MIN_INT_RESOLUTION..=MAX_INT_RESOLUTION).contains(&self.int_resolution) {
            return Err(AlsfError::InvalidConfig(format!(
                "integer resolution {} outside {MIN_INT_RESOLUTION}..={MAX_INT_RESOLUTION}",
                self.int_resolution
            )));
        }
        if self.max_predictor_order > MAX_PREDICTOR_ORDER {
            return Err(AlsfError::InvalidConfig(format!(
                "predictor order {} above {MAX_PREDICTOR_ORDER}",
                self.max_predictor_order
            )));
        }
        Ok(())
    }

    /// Whether frame `index` must be decodable on its own.
    pub fn is_random_access(&self, index: usize) -> bool {
        match self.random_access_interval {
            0 => index == 0,
            n => index % n as usize == 0,
        }
    }
}
