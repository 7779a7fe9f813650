use tracing::warn;

use super::encoder::ACF_MANTISSA_BITS;
use super::quantize::{apply_residual, code_to_shift, part_b_width, reconstruct};
use super::state::{ChannelFrameState, SHIFT_UNSET};
use crate::config::AcfMode;
use crate::core::BitReader;
use crate::error::{try_vec_with_capacity, AlsfError, AlsfResult};
use crate::mlz::MlzDecoder;

/// Float decoder for one channel, mirroring `ChannelEncoder`.
#[derive(Debug, Clone)]
pub struct ChannelDecoder {
    state: ChannelFrameState,
    mlz: MlzDecoder,
    int_res: u8,
}

impl ChannelDecoder {
    pub fn new(int_res: u8) -> Self {
        ChannelDecoder {
            state: ChannelFrameState::new(AcfMode::Strict),
            mlz: MlzDecoder::new(),
            int_res,
        }
    }

    pub fn state(&self) -> &ChannelFrameState {
        &self.state
    }

    pub fn flush(&mut self) {
        self.state.reset();
        self.mlz.flush();
    }

    /// Rebuild one channel of a frame from its integers and the bits read
    /// from `reader`. Leaves the reader on the next byte boundary.
    pub fn decode_channel(
        &mut self,
        reader: &mut BitReader,
        ints: &[i32],
        use_acf: bool,
    ) -> AlsfResult<Vec<f32>> {
        let mut a = 1.0f32;
        if use_acf && reader.read_flag()? {
            let mantissa = reader.read_bits(ACF_MANTISSA_BITS)?;
            a = f32::from_bits((127 << 23) | mantissa);
        }
        self.state.last_acf_gain = a;

        let highest = reader.read_bits(2)? as u8;
        let shift_changed = reader.read_flag()?;
        let part_a_present = reader.read_flag()?;
        if shift_changed {
            let code = reader.read_bits(8)? as u8;
            if code == SHIFT_UNSET {
                return Err(corrupt("shift byte holds the unset marker"));
            }
            self.state.last_shift = code;
        }

        let zeros = ints.iter().filter(|&&q| q == 0).count();
        if part_a_present != (zeros > 0) {
            return Err(mismatch(format!(
                "part a flag {part_a_present} with {zeros} zero integers"
            )));
        }
        let live = ints.len() - zeros;
        if live > 0 && self.state.last_shift == SHIFT_UNSET {
            return Err(corrupt("integers present before any shift"));
        }
        if live == 0 && highest != 0 {
            return Err(mismatch("part b present without nonzero integers".into()));
        }
        let shift = code_to_shift(self.state.last_shift);

        // Part A
        let verbatim = if part_a_present {
            let widths = vec![8u8; zeros * 4];
            self.read_partition(reader, &widths)?
        } else {
            Vec::new()
        };

        let mut out = try_vec_with_capacity(ints.len())?;
        let mut recon = try_vec_with_capacity(live)?;
        for &q in ints {
            if q != 0 {
                let r = reconstruct(q, shift, self.int_res, a);
                recon.push(r);
                out.push(r);
            } else {
                out.push(0.0);
            }
        }

        // Part B
        if highest != 0 {
            let sample_widths: Vec<u32> = recon
                .iter()
                .map(|&r| part_b_width(a, shift, self.int_res, r, highest))
                .collect();
            let mut widths = Vec::new();
            for &w in &sample_widths {
                push_widths(w, &mut widths);
            }
            let symbols = self.read_partition(reader, &widths)?;

            let mut pos = 0;
            let mut width_iter = sample_widths.iter();
            for (sample, &q) in out.iter_mut().zip(ints) {
                if q == 0 {
                    continue;
                }
                let w = width_iter.next().copied().unwrap_or(0);
                let count = w.div_ceil(8) as usize;
                let d = join_symbols(&symbols[pos..pos + count], w);
                pos += count;
                *sample = apply_residual(*sample, d)?;
            }
        }

        let mut verbatim_words = verbatim.chunks_exact(4);
        for (sample, &q) in out.iter_mut().zip(ints) {
            if q == 0 {
                let word = verbatim_words
                    .next()
                    .ok_or_else(|| mismatch("part a shorter than its samples".into()))?;
                *sample = f32::from_bits(u32::from_be_bytes([word[0], word[1], word[2], word[3]]));
            }
        }

        reader.align_to_byte();
        Ok(out)
    }

    // flag + payload; returns one symbol per entry of `widths`
    fn read_partition(&mut self, reader: &mut BitReader, widths: &[u8]) -> AlsfResult<Vec<u8>> {
        if reader.read_flag()? {
            return self.mlz.decode(reader, widths.len());
        }
        let mut symbols = try_vec_with_capacity(widths.len())?;
        for &w in widths {
            let v = reader.read_bits(w as u32)? as u8;
            symbols.push(if w >= 8 { v } else { v << (8 - w) });
        }
        Ok(symbols)
    }
}

fn push_widths(width: u32, widths: &mut Vec<u8>) {
    let mut left = width;
    while left > 0 {
        let w = left.min(8);
        widths.push(w as u8);
        left -= w;
    }
}

// inverse of encoder::split_symbols; bits below the width are ignored
fn join_symbols(symbols: &[u8], width: u32) -> u32 {
    if width == 0 {
        return 0;
    }
    let padded = symbols.iter().fold(0u64, |acc, &s| (acc << 8) | s as u64);
    (padded >> (8 * symbols.len() as u32 - width)) as u32
}

fn corrupt(msg: &str) -> AlsfError {
    warn!("{msg}");
    AlsfError::InvalidHeader(msg.to_string())
}

fn mismatch(msg: String) -> AlsfError {
    warn!("{msg}");
    AlsfError::PartitionMismatch(msg)
}

/// Frame-level float decoder: one `ChannelDecoder` per channel.
#[derive(Debug, Clone)]
pub struct FloatFrameDecoder {
    channels: Vec<ChannelDecoder>,
}

impl FloatFrameDecoder {
    pub fn new(channels: usize, int_res: u8) -> Self {
        FloatFrameDecoder {
            channels: (0..channels).map(|_| ChannelDecoder::new(int_res)).collect(),
        }
    }

    pub fn flush(&mut self) {
        for ch in &mut self.channels {
            ch.flush();
        }
    }

    /// Decode the float block of one frame; returns samples per channel.
    pub fn decode_frame(
        &mut self,
        ints: &[Vec<i32>],
        data: &[u8],
        random_access: bool,
    ) -> AlsfResult<Vec<Vec<f32>>> {
        if ints.len() != self.channels.len() {
            return Err(AlsfError::InvalidInput(format!(
                "expected {} channels, got {}",
                self.channels.len(),
                ints.len()
            )));
        }
        if random_access {
            self.flush();
        }

        let mut reader = BitReader::new(data);
        let use_acf = reader.read_flag()?;
        let mut out = Vec::with_capacity(ints.len());
        for (dec, ch) in self.channels.iter_mut().zip(ints) {
            out.push(dec.decode_channel(&mut reader, ch, use_acf)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_ignores_bits_below_the_width() {
        // the dictionary may hand back anything below the mask
        assert_eq!(join_symbols(&[0b1011_1001, 0b1011_1111], 11), 0b101_1100_1101);
        assert_eq!(join_symbols(&[0xFF], 0), 0);
    }

    #[test]
    fn widths_split_into_bytes() {
        let mut w = Vec::new();
        push_widths(19, &mut w);
        push_widths(0, &mut w);
        push_widths(8, &mut w);
        assert_eq!(w, vec![8, 8, 3, 8]);
    }
}
