use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::acf::{check_acf, estimate_acf};
use super::quantize::{
    highest_byte, is_identity, part_b_width, quantize_channel, shift_to_code, QuantizedChannel,
};
use super::state::ChannelFrameState;
use crate::config::EncoderConfig;
use crate::core::BitWriter;
use crate::error::{AlsfError, AlsfResult};
use crate::mlz::MlzEncoder;

/// Raw mantissa bits of a multiplier in [1, 2).
pub(crate) const ACF_MANTISSA_BITS: u32 = 23;

/// Everything one channel contributes to a frame.
#[derive(Debug, Clone)]
pub struct ChannelEncodeResult {
    pub ints: Vec<i32>,
    pub acf_gain: f32,
    pub shift: u8,
    pub shift_changed: bool,
    pub highest_byte: u8,
    /// flag bit + payload, present when some integer is zero
    pub part_a: Option<BitWriter>,
    /// flag bit + payload, present when `highest_byte != 0`
    pub part_b: Option<BitWriter>,
}

impl ChannelEncodeResult {
    pub fn part_a_present(&self) -> bool {
        self.part_a.is_some()
    }

    /// Serialize this channel; `use_acf` is the frame-level flag.
    pub fn write(&self, out: &mut BitWriter, use_acf: bool) {
        if use_acf {
            if is_identity(self.acf_gain) {
                out.write_bit(0);
            } else {
                out.write_bit(1);
                out.write_bits(self.acf_gain.to_bits() & 0x7F_FFFF, ACF_MANTISSA_BITS);
            }
        }
        out.write_bits(self.highest_byte as u32, 2);
        out.write_bit(self.shift_changed as u32);
        out.write_bit(self.part_a_present() as u32);
        if self.shift_changed {
            out.write_bits(self.shift as u32, 8);
        }
        if let Some(part_a) = &self.part_a {
            out.append(part_a);
        }
        if let Some(part_b) = &self.part_b {
            out.append(part_b);
        }
        out.align_to_byte();
    }
}

/// Float encoder for one channel; owns the channel's state and dictionary.
#[derive(Debug, Clone)]
pub struct ChannelEncoder {
    state: ChannelFrameState,
    mlz: MlzEncoder,
    int_res: u8,
    use_acf: bool,
    compress: bool,
    /// next frame is a random-access point and goes out with a = 1
    force_identity: bool,
}

impl ChannelEncoder {
    pub fn new(config: &EncoderConfig) -> Self {
        ChannelEncoder {
            state: ChannelFrameState::new(config.acf_mode),
            mlz: MlzEncoder::new(config.dictionary_policy),
            int_res: config.int_resolution,
            use_acf: config.use_acf,
            compress: config.compress_residuals,
            force_identity: false,
        }
    }

    pub fn state(&self) -> &ChannelFrameState {
        &self.state
    }

    /// Forget everything carried across frames. The next frame is coded
    /// without a multiplier; the one after it searches again.
    pub fn flush(&mut self) {
        self.state.reset();
        self.mlz.flush();
        self.force_identity = true;
    }

    /// Encode one frame of this channel.
    pub fn encode_channel(&mut self, samples: &[f32]) -> AlsfResult<ChannelEncodeResult> {
        let a = if std::mem::take(&mut self.force_identity) {
            1.0
        } else {
            self.select_multiplier(samples)
        };
        let quantized = quantize_channel(samples, a, self.int_res, self.state.shift());

        let shift = shift_to_code(quantized.shift);
        let shift_changed = shift != self.state.last_shift;
        if shift_changed {
            debug!(shift = quantized.shift, "shift changed");
        }
        self.state.set_shift(quantized.shift);

        let part_a = self.encode_part_a(samples, &quantized)?;
        let (highest, part_b) = self.encode_part_b(a, &quantized)?;

        Ok(ChannelEncodeResult {
            ints: quantized.ints,
            acf_gain: a,
            shift,
            shift_changed,
            highest_byte: highest,
            part_a,
            part_b,
        })
    }

    fn select_multiplier(&mut self, samples: &[f32]) -> f32 {
        if !self.use_acf {
            return 1.0;
        }
        let mode = self.state.acf_mode;
        let last = self.state.last_acf_gain;

        if last != 0.0 && !is_identity(last) {
            if check_acf(samples, last, self.int_res, mode) {
                return last;
            }
            debug!(a = last, "previous multiplier no longer fits");
        } else if is_identity(last) && self.state.cooling_down() {
            return 1.0;
        }

        let a = estimate_acf(samples, self.int_res, mode);
        if is_identity(a) {
            self.state.record_failure();
            debug!(
                retries = self.state.search_retry_count,
                cooldown = self.state.retry_cooldown,
                "no common multiplier"
            );
        } else {
            self.state.record_success(a);
        }
        a
    }

    // verbatim 32-bit samples for every zero integer
    fn encode_part_a(
        &mut self,
        samples: &[f32],
        quantized: &QuantizedChannel,
    ) -> AlsfResult<Option<BitWriter>> {
        let symbols: Vec<u8> = samples
            .iter()
            .zip(&quantized.ints)
            .filter(|(_, &q)| q == 0)
            .flat_map(|(x, _)| x.to_bits().to_be_bytes())
            .collect();
        if symbols.is_empty() {
            return Ok(None);
        }
        let widths = vec![8u8; symbols.len()];
        self.encode_partition(&symbols, &widths, "part a").map(Some)
    }

    fn encode_part_b(
        &mut self,
        a: f32,
        quantized: &QuantizedChannel,
    ) -> AlsfResult<(u8, Option<BitWriter>)> {
        let live = || {
            quantized
                .ints
                .iter()
                .zip(&quantized.recon)
                .zip(&quantized.residuals)
                .filter(|((&q, _), _)| q != 0)
        };
        let highest = highest_byte(live().map(|(_, &d)| d));
        if highest == 0 {
            return Ok((0, None));
        }

        let mut symbols = Vec::new();
        let mut widths = Vec::new();
        for ((_, &r), &d) in live() {
            let width = part_b_width(a, quantized.shift, self.int_res, r, highest);
            if d >> width != 0 {
                return Err(AlsfError::InvalidResidual(format!(
                    "residual {d} wider than {width} bits"
                )));
            }
            split_symbols(d, width, &mut symbols, &mut widths);
        }
        let part_b = self.encode_partition(&symbols, &widths, "part b")?;
        Ok((highest, Some(part_b)))
    }

    // flag + payload, dictionary-coded only when strictly smaller than raw
    fn encode_partition(
        &mut self,
        symbols: &[u8],
        widths: &[u8],
        name: &str,
    ) -> AlsfResult<BitWriter> {
        let raw_bits: usize = widths.iter().map(|&w| w as usize).sum();

        if self.compress && !symbols.is_empty() {
            self.mlz.backup();
            let mut packed = BitWriter::with_capacity(raw_bits / 8);
            self.mlz.encode(symbols, widths, &mut packed)?;
            trace!(partition = name, raw_bits, packed_bits = packed.bit_len(), "partition sizes");

            if packed.bit_len() < raw_bits {
                self.mlz.commit();
                let mut out = BitWriter::with_capacity(packed.byte_count() + 1);
                out.write_bit(1);
                out.append(&packed);
                return Ok(out);
            }
            self.mlz.resume();
        }

        let mut out = BitWriter::with_capacity(raw_bits / 8 + 1);
        out.write_bit(0);
        for (&s, &w) in symbols.iter().zip(widths) {
            out.write_bits((s >> (8 - w)) as u32, w as u32);
        }
        Ok(out)
    }
}

/// Split a `width`-bit residual into MSB-first symbols; the last one keeps
/// only its top `width % 8` bits.
pub(crate) fn split_symbols(d: u32, width: u32, symbols: &mut Vec<u8>, widths: &mut Vec<u8>) {
    if width == 0 {
        return;
    }
    let count = width.div_ceil(8);
    let padded = (d as u64) << (8 * count - width);
    for i in (0..count).rev() {
        symbols.push((padded >> (8 * i)) as u8);
        let w = if i == 0 { width - 8 * (count - 1) } else { 8 };
        widths.push(w as u8);
    }
}

/// One coded frame of the float engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatFrame {
    /// quantized integers per channel
    pub ints: Vec<Vec<i32>>,
    /// diff-float block for every channel
    pub data: Vec<u8>,
}

/// Frame-level float encoder: one `ChannelEncoder` per channel.
#[derive(Debug, Clone)]
pub struct FloatFrameEncoder {
    channels: Vec<ChannelEncoder>,
    frame_size: usize,
}

impl FloatFrameEncoder {
    pub fn new(channels: usize, config: &EncoderConfig) -> AlsfResult<Self> {
        config.validate(channels)?;
        Ok(FloatFrameEncoder {
            channels: (0..channels).map(|_| ChannelEncoder::new(config)).collect(),
            frame_size: config.frame_size,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Reset every channel so the next frame decodes on its own.
    pub fn flush(&mut self) {
        for ch in &mut self.channels {
            ch.flush();
        }
    }

    /// Encode one frame; `samples[c]` is channel `c`.
    pub fn encode_frame(&mut self, samples: &[&[f32]], random_access: bool) -> AlsfResult<FloatFrame> {
        if samples.len() != self.channels.len() {
            return Err(AlsfError::InvalidInput(format!(
                "expected {} channels, got {}",
                self.channels.len(),
                samples.len()
            )));
        }
        let len = samples.first().map_or(0, |s| s.len());
        if len == 0 || len > self.frame_size || samples.iter().any(|s| s.len() != len) {
            return Err(AlsfError::InvalidInput(format!(
                "frame of {len} samples does not fit frame size {}",
                self.frame_size
            )));
        }
        if random_access {
            self.flush();
        }

        #[cfg(feature = "parallel")]
        let results: Vec<ChannelEncodeResult> = self
            .channels
            .par_iter_mut()
            .zip(samples.par_iter())
            .map(|(enc, s)| enc.encode_channel(s))
            .collect::<AlsfResult<_>>()?;

        #[cfg(not(feature = "parallel"))]
        let results: Vec<ChannelEncodeResult> = self
            .channels
            .iter_mut()
            .zip(samples)
            .map(|(enc, s)| enc.encode_channel(s))
            .collect::<AlsfResult<_>>()?;

        let use_acf = results.iter().any(|r| !is_identity(r.acf_gain));
        let mut out = BitWriter::with_capacity(len * results.len());
        out.write_bit(use_acf as u32);
        for r in &results {
            r.write(&mut out, use_acf);
        }

        Ok(FloatFrame {
            ints: results.into_iter().map(|r| r.ints).collect(),
            data: out.into_bytes(),
        })
    }
}
