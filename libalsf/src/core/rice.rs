// Rice coding for the integer PCM layer

use super::bits::{BitReader, BitWriter};
use crate::error::{AlsfError, AlsfResult};

/// Longest unary run the encoder will emit for one value.
pub const MAX_QUOTIENT: u32 = 255;

/// Largest Rice parameter; enough for 24-bit samples through a fourth-order
/// fixed predictor.
pub const MAX_RICE_PARAMETER: u8 = 30;

/// Estimate Rice parameter from integer residuals
/// Ensures k is large enough that no quotient exceeds 255 during encoding
pub fn estimate_rice_parameter(residuals: &[i32]) -> u8 {
    if residuals.is_empty() {
        return 4;
    }

    // Find maximum absolute value to ensure no overflow
    let max_unsigned = residuals.iter().map(|&r| zigzag(r) as u64).max().unwrap_or(0);

    if max_unsigned == 0 {
        return 0;
    }

    // quotient = unsigned >> k must stay <= 255
    let min_k = if max_unsigned > MAX_QUOTIENT as u64 {
        let bits_needed = 64 - max_unsigned.leading_zeros();
        bits_needed.saturating_sub(8) as u8
    } else {
        0
    };

    // Also consider mean for efficiency
    let sum: u64 = residuals.iter().map(|&r| r.unsigned_abs() as u64).sum();
    let mean = sum / residuals.len() as u64;
    let mean_k = if mean > 0 {
        (64 - mean.leading_zeros()) as u8
    } else {
        0
    };

    min_k.max(mean_k).min(MAX_RICE_PARAMETER)
}

/// Rice encode integer residuals
pub fn encode(residuals: &[i32], k: u8) -> Vec<u8> {
    let mut bits = BitWriter::with_capacity(residuals.len());

    for &sample in residuals {
        encode_sample(&mut bits, sample, k);
    }

    bits.into_bytes()
}

/// Size in bytes `encode` would produce, without building the output.
pub fn encoded_len(residuals: &[i32], k: u8) -> usize {
    let bits: u64 = residuals
        .iter()
        .map(|&r| (zigzag(r) >> k) as u64 + 1 + k as u64)
        .sum();
    bits.div_ceil(8) as usize
}

fn encode_sample(bits: &mut BitWriter, sample: i32, k: u8) {
    let unsigned = zigzag(sample);

    let quotient = unsigned >> k;
    let remainder = if k == 0 { 0 } else { unsigned & ((1u32 << k) - 1) };

    debug_assert!(quotient <= MAX_QUOTIENT, "rice parameter too small");
    for _ in 0..quotient {
        bits.write_bit(1);
    }
    bits.write_bit(0);

    bits.write_bits(remainder, k as u32);
}

/// Rice decode exactly `target_len` integer residuals
pub fn decode(encoded: &[u8], k: u8, target_len: usize) -> AlsfResult<Vec<i32>> {
    if k > MAX_RICE_PARAMETER {
        return Err(AlsfError::InvalidHeader(format!("rice parameter {k} out of range")));
    }
    let mut bits = BitReader::new(encoded);
    let mut residuals = Vec::with_capacity(target_len);

    for _ in 0..target_len {
        let mut quotient = 0u32;
        while bits.read_bit()? == 1 {
            quotient += 1;
            if quotient > MAX_QUOTIENT {
                return Err(AlsfError::InvalidHeader("rice quotient overflow".to_string()));
            }
        }

        let remainder = bits.read_bits(k as u32)?;
        let unsigned = ((quotient as u64) << k) | remainder as u64;
        if unsigned > u32::MAX as u64 {
            return Err(AlsfError::InvalidHeader("rice value overflow".to_string()));
        }

        residuals.push(unzigzag(unsigned as u32));
    }

    Ok(residuals)
}

// 0 → 0, -1 → 1, 1 → 2, -2 → 3, 2 → 4, ...
#[inline]
fn zigzag(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

#[inline]
fn unzigzag(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}
