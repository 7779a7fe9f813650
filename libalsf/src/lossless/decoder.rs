use tracing::debug;

use crate::core::types::{AlsfFile, Frame, IntChannelData};
use crate::core::rice;
use crate::error::{AlsfError, AlsfResult};
use crate::float::FloatFrameDecoder;
use crate::Reader;

use super::predictor::{fixed_reconstruct, MAX_ORDER};

/// audio decoder for alsf streams
pub struct Decoder;

impl Decoder {
    pub fn new() -> Self {
        Decoder
    }

    /// decode an alsf stream to interleaved samples
    pub fn decode(&self, data: &[u8]) -> AlsfResult<Vec<f32>> {
        let file = Reader::new().read(data)?;
        self.decode_file(&file)
    }

    /// decode from parsed file
    pub fn decode_file(&self, file: &AlsfFile) -> AlsfResult<Vec<f32>> {
        self.decode_range(file, 0, 0)
    }

    /// Decode starting at frame `frame`.
    ///
    /// Decoding begins at the closest random-access frame at or before
    /// `frame`; the frames in between are decoded and dropped.
    pub fn decode_from(&self, file: &AlsfFile, frame: usize) -> AlsfResult<Vec<f32>> {
        if frame >= file.frames.len() {
            return Err(AlsfError::InvalidInput(format!(
                "frame {frame} past the last of {}",
                file.frames.len()
            )));
        }
        let start = file.frames[..=frame]
            .iter()
            .rposition(Frame::is_random_access)
            .ok_or_else(|| {
                AlsfError::InvalidHeader(format!("no random-access frame at or before {frame}"))
            })?;
        debug!(frame, start, "seeking");
        self.decode_range(file, start, frame - start)
    }

    fn decode_range(&self, file: &AlsfFile, start: usize, skip: usize) -> AlsfResult<Vec<f32>> {
        let channels = file.header.channels as usize;
        if let Some(first) = file.frames.get(start) {
            if !first.is_random_access() {
                return Err(AlsfError::InvalidHeader(format!(
                    "frame {start} is not a random-access frame"
                )));
            }
        }

        let mut float_decoder = FloatFrameDecoder::new(channels, file.header.int_resolution);
        let mut interleaved = Vec::new();

        for (i, frame) in file.frames.iter().enumerate().skip(start) {
            if frame.channels.len() != channels {
                return Err(AlsfError::InvalidHeader(format!(
                    "frame {i} has {} channels, stream has {channels}",
                    frame.channels.len()
                )));
            }
            let n = frame.frame_samples as usize;
            let ints = frame
                .channels
                .iter()
                .map(|ch| self.decode_channel_int(ch, n))
                .collect::<AlsfResult<Vec<_>>>()?;

            let planar =
                float_decoder.decode_frame(&ints, &frame.float_data, frame.is_random_access())?;
            if i - start < skip {
                continue;
            }

            interleaved.reserve(n * channels);
            for s in 0..n {
                for ch in &planar {
                    interleaved.push(ch[s]);
                }
            }
        }

        Ok(interleaved)
    }

    /// Decode a single channel to integers
    fn decode_channel_int(&self, ch: &IntChannelData, frame_samples: usize) -> AlsfResult<Vec<i32>> {
        if ch.is_silent() {
            return Ok(vec![0; frame_samples]);
        }
        let order = ch.predictor_order as usize;
        if order > MAX_ORDER {
            return Err(AlsfError::InvalidHeader(format!("predictor order {order}")));
        }
        if ch.wasted_bits > 31 {
            return Err(AlsfError::InvalidHeader(format!(
                "{} wasted bits",
                ch.wasted_bits
            )));
        }

        let residuals = rice::decode(&ch.residuals, ch.rice_parameter, frame_samples)?;
        let mut samples = fixed_reconstruct(&residuals, order);
        if ch.wasted_bits > 0 {
            for s in &mut samples {
                *s <<= ch.wasted_bits;
            }
        }
        Ok(samples)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
