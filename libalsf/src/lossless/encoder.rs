use tracing::{debug, info};

use crate::config::EncoderConfig;
use crate::core::{rice, Frame, IntChannelData, FRAME_FLAG_RANDOM_ACCESS};
use crate::error::{AlsfError, AlsfResult};
use crate::float::FloatFrameEncoder;
use crate::Writer;

use super::predictor::{fixed_residuals, wasted_bits};

/// Whole-stream encoder: interleaved float samples in, ALSF bytes out.
pub struct Encoder {
    sample_rate: u32,
    channels: u8,
    config: EncoderConfig,
}

impl Encoder {
    pub fn new(sample_rate: u32, channels: u8, config: EncoderConfig) -> AlsfResult<Self> {
        config.validate(channels as usize)?;
        Ok(Encoder {
            sample_rate,
            channels,
            config,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// encode interleaved samples, with optional msgpack metadata
    pub fn encode(&self, samples: &[f32], metadata: &[u8]) -> AlsfResult<Vec<u8>> {
        let frames = self.encode_frames(samples)?;
        let total_samples = (samples.len() / self.channels as usize) as u64;

        Writer::new().write(
            self.sample_rate,
            self.channels,
            &self.config,
            total_samples,
            &frames,
            metadata,
        )
    }

    /// Frame the input and run every frame through the float engine.
    pub fn encode_frames(&self, samples: &[f32]) -> AlsfResult<Vec<Frame>> {
        let channels = self.channels as usize;
        if samples.len() % channels != 0 {
            return Err(AlsfError::InvalidInput(format!(
                "{} samples do not divide into {channels} channels",
                samples.len()
            )));
        }
        let frame_size = self.config.frame_size;
        let total = samples.len() / channels;
        let num_frames = total.div_ceil(frame_size);

        let mut float_encoder = FloatFrameEncoder::new(channels, &self.config)?;
        let mut frames = Vec::with_capacity(num_frames);
        let mut planar: Vec<Vec<f32>> = vec![Vec::with_capacity(frame_size); channels];

        for frame_idx in 0..num_frames {
            let start = frame_idx * frame_size;
            let end = ((frame_idx + 1) * frame_size).min(total);

            // deinterleave
            for (ch, buf) in planar.iter_mut().enumerate() {
                buf.clear();
                buf.extend(
                    samples[start * channels..end * channels]
                        .iter()
                        .skip(ch)
                        .step_by(channels),
                );
            }

            let random_access = self.config.is_random_access(frame_idx);
            let refs: Vec<&[f32]> = planar.iter().map(|c| c.as_slice()).collect();
            let float_frame = float_encoder.encode_frame(&refs, random_access)?;

            let flags = if random_access {
                FRAME_FLAG_RANDOM_ACCESS
            } else {
                0
            };
            let mut frame = Frame::new(flags, (end - start) as u32);
            frame.channels = float_frame
                .ints
                .iter()
                .map(|ints| self.encode_channel_int(ints))
                .collect();
            frame.float_data = float_frame.data;

            debug!(
                frame = frame_idx,
                random_access,
                bytes = frame.byte_size(),
                "frame encoded"
            );
            frames.push(frame);
        }

        info!(frames = frames.len(), samples = total, "stream encoded");
        Ok(frames)
    }

    /// Code one channel's integers with the smallest fixed predictor.
    fn encode_channel_int(&self, ints: &[i32]) -> IntChannelData {
        if ints.iter().all(|&s| s == 0) {
            return IntChannelData::new_silence();
        }

        let wasted = wasted_bits(ints);
        let shifted: Vec<i32> = ints.iter().map(|&s| s >> wasted).collect();

        let mut best: Option<(u8, u8, usize)> = None;
        for order in 0..=self.config.max_predictor_order as usize {
            let residuals = fixed_residuals(&shifted, order);
            let k = rice::estimate_rice_parameter(&residuals);
            let size = rice::encoded_len(&residuals, k);
            if best.map_or(true, |(_, _, s)| size < s) {
                best = Some((order as u8, k, size));
            }
        }
        let (order, k, _) = best.unwrap_or((0, rice::estimate_rice_parameter(&shifted), 0));

        let residuals = fixed_residuals(&shifted, order as usize);
        IntChannelData {
            predictor_order: order,
            wasted_bits: wasted,
            rice_parameter: k,
            residuals: rice::encode(&residuals, k),
        }
    }
}
