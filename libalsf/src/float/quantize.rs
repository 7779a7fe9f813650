//! Shift selection, integer conversion and the mantissa residual
//!
//! A channel is converted to `IntRes`-bit integers as
//! `trunc(x / a * 2^(IntRes - 1 - shift))`. The float implied by an integer is
//! rebuilt with `reconstruct`, and the gap to the original sample is the
//! residual `D`, counted in units of the reconstruction's last place.

use super::float32::{
    decompose, divide, exp2_f64, floor_log2, multiply, recompose, scale_by_power_of_two,
    MIN_EXPONENT,
};
use crate::error::{AlsfError, AlsfResult};

/// Most the shift may grow over the previous frame while only a few
/// outliers need it.
pub const MAX_SHIFT_STEP: i32 = 3;

/// Outliers tolerated when the shift is held back: one per this many samples.
pub const SHIFT_OUTLIER_DIVISOR: usize = 64;

/// Largest residual carried in Part B (three bytes).
pub const MAX_RESIDUAL: u32 = (1 << 24) - 1;

/// Largest exponent gap between a sample and its reconstruction.
pub const MAX_EXPONENT_GAP: i32 = 8;

/// Largest shift; the stored byte is `shift + 127`.
pub const MAX_SHIFT: i32 = 127;

// floor(log2) of every finite nonzero float lies in -149..=127
const HISTOGRAM_OFFSET: i32 = 149;
const HISTOGRAM_BINS: usize = 277;

/// Smallest shift for `int_res`; the integer unit never drops below 2^-149.
pub fn min_shift(int_res: u8) -> i32 {
    (int_res as i32 - 150).max(-127)
}

/// Biased byte for a shift.
pub fn shift_to_code(shift: i32) -> u8 {
    (shift + 127) as u8
}

pub fn code_to_shift(code: u8) -> i32 {
    code as i32 - 127
}

/// Whether `a` leaves samples untouched.
#[inline]
pub fn is_identity(a: f32) -> bool {
    a == 1.0
}

/// Choose the shift for a channel's divided samples.
///
/// The shift covers the largest magnitude present unless that would grow it
/// by more than `MAX_SHIFT_STEP` over `last_shift` for only a handful of
/// samples; those samples then become outliers and travel verbatim.
pub fn select_shift(values: &[f32], int_res: u8, last_shift: Option<i32>) -> i32 {
    let mut histogram = [0usize; HISTOGRAM_BINS];
    let mut any = false;
    for &y in values {
        if y.is_finite() && y != 0.0 {
            histogram[(floor_log2(y) + HISTOGRAM_OFFSET) as usize] += 1;
            any = true;
        }
    }

    let lo = min_shift(int_res);
    if !any {
        return last_shift.unwrap_or(0).clamp(lo, MAX_SHIFT);
    }

    let top = histogram.iter().rposition(|&n| n > 0).unwrap_or(0) as i32 - HISTOGRAM_OFFSET;
    let mut shift = top + 1;

    if let Some(last) = last_shift {
        let cap = last + MAX_SHIFT_STEP;
        if shift > cap {
            let first_outlier_bin = (cap + HISTOGRAM_OFFSET).max(0) as usize;
            let outliers: usize = histogram[first_outlier_bin.min(HISTOGRAM_BINS)..].iter().sum();
            if outliers <= values.len() / SHIFT_OUTLIER_DIVISOR {
                shift = cap;
            }
        }
    }
    shift.clamp(lo, MAX_SHIFT)
}

/// Integer for `y` at `shift`, or 0 when `y` does not fit.
pub fn to_integer(y: f32, shift: i32, int_res: u8) -> i32 {
    if !y.is_finite() || y == 0.0 || floor_log2(y) >= shift {
        return 0;
    }
    let scaled = y as f64 * exp2_f64(int_res as i32 - 1 - shift);
    scaled.trunc() as i32
}

/// The float an integer stands for.
pub fn reconstruct(value: i32, shift: i32, int_res: u8, a: f32) -> f32 {
    let base = scale_by_power_of_two(value as f32, shift - int_res as i32 + 1);
    if is_identity(a) {
        base
    } else {
        recompose(multiply(decompose(base), decompose(a)))
    }
}

/// Residual from `recon` up to `x` in units of `recon`'s last place, or
/// `None` when the pair cannot be carried in Part B.
pub fn residual(x: f32, recon: f32) -> Option<u32> {
    if !x.is_finite() || !recon.is_finite() || x.is_sign_negative() != recon.is_sign_negative() {
        return None;
    }
    let (mx, ex) = decompose(x).ulp_form();
    let (mr, er) = decompose(recon).ulp_form();
    let gap = ex - er;
    if !(0..=MAX_EXPONENT_GAP).contains(&gap) {
        return None;
    }
    let d = ((mx as u64) << gap).checked_sub(mr as u64)?;
    (d <= MAX_RESIDUAL as u64).then_some(d as u32)
}

/// Inverse of `residual`.
pub fn apply_residual(recon: f32, d: u32) -> AlsfResult<f32> {
    if d == 0 {
        return Ok(recon);
    }
    if !recon.is_finite() {
        return Err(AlsfError::InvalidResidual(format!(
            "residual {d} on non-finite reconstruction"
        )));
    }
    let v = decompose(recon);
    let (mr, er) = v.ulp_form();
    let mut t = mr as u64 + d as u64;
    let sign = (v.sign as u32) << 31;

    if t < 1 << 23 {
        return Ok(f32::from_bits(sign | t as u32));
    }
    let length = 64 - t.leading_zeros() as i32;
    let shift = length - 24;
    let mut exponent = er;
    if shift > 0 {
        if t & ((1u64 << shift) - 1) != 0 {
            return Err(AlsfError::InvalidResidual(format!(
                "residual {d} leaves bits below the last place"
            )));
        }
        t >>= shift;
        exponent += shift;
    }
    if exponent > 127 {
        return Err(AlsfError::InvalidResidual(format!("residual {d} overflows")));
    }
    Ok(f32::from_bits(
        sign | (((exponent + 127) as u32) << 23) | (t as u32 & 0x7F_FFFF),
    ))
}

/// Bits a residual can need when `a == 1`: the integer unit over the
/// reconstruction's last place.
pub fn natural_width(shift: i32, int_res: u8, recon: f32) -> u32 {
    let (_, er) = decompose(recon).ulp_form();
    let unit = shift - int_res as i32 + 1;
    (unit - (er.max(MIN_EXPONENT) - 23)).max(0) as u32
}

/// Part B width of one sample.
pub fn part_b_width(a: f32, shift: i32, int_res: u8, recon: f32, highest_byte: u8) -> u32 {
    let cap = 8 * highest_byte as u32;
    if is_identity(a) {
        natural_width(shift, int_res, recon).min(cap)
    } else {
        cap
    }
}

/// Bytes needed for the largest residual (0..=3).
pub fn highest_byte(residuals: impl IntoIterator<Item = u32>) -> u8 {
    let max = residuals.into_iter().max().unwrap_or(0);
    (32 - max.leading_zeros()).div_ceil(8) as u8
}

/// One channel after integer conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedChannel {
    pub shift: i32,
    pub ints: Vec<i32>,
    /// reconstruction per sample (meaningless where the integer is 0)
    pub recon: Vec<f32>,
    /// Part B residual per sample (0 where the integer is 0)
    pub residuals: Vec<u32>,
}

impl QuantizedChannel {
    /// Finite nonzero samples that did not come back exactly.
    pub fn mismatches(&self, samples: &[f32]) -> usize {
        samples
            .iter()
            .zip(&self.ints)
            .zip(&self.residuals)
            .filter(|((x, &q), &d)| x.is_finite() && **x != 0.0 && (q == 0 || d != 0))
            .count()
    }

    /// Sum of residual bit lengths, the cost estimate for relaxed checking.
    pub fn residual_score(&self) -> u64 {
        self.residuals
            .iter()
            .map(|&d| (32 - d.leading_zeros()) as u64)
            .sum()
    }

    pub fn zero_count(&self) -> usize {
        self.ints.iter().filter(|&&q| q == 0).count()
    }
}

/// Convert `samples` to integers for multiplier `a`.
pub fn quantize_channel(
    samples: &[f32],
    a: f32,
    int_res: u8,
    last_shift: Option<i32>,
) -> QuantizedChannel {
    let ys: Vec<f32> = if is_identity(a) {
        samples.to_vec()
    } else {
        samples.iter().map(|&x| divide(x, a)).collect()
    };
    let shift = select_shift(&ys, int_res, last_shift);

    let n = samples.len();
    let mut ints = Vec::with_capacity(n);
    let mut recon = Vec::with_capacity(n);
    let mut residuals = Vec::with_capacity(n);

    for (&x, &y) in samples.iter().zip(&ys) {
        let mut q = to_integer(y, shift, int_res);
        if q != 0 && !is_identity(a) {
            q = refine(x, q, shift, int_res, a);
        }
        let mut r = 0.0;
        let mut d = 0;
        if q != 0 {
            r = reconstruct(q, shift, int_res, a);
            match residual(x, r) {
                Some(v) => d = v,
                None => q = 0,
            }
        }
        ints.push(q);
        recon.push(r);
        residuals.push(if q == 0 { 0 } else { d });
    }

    QuantizedChannel {
        shift,
        ints,
        recon,
        residuals,
    }
}

// Nudge q by up to two steps: an exact reconstruction first, otherwise the
// largest magnitude that does not overshoot x. 0 sends the sample to Part A.
fn refine(x: f32, q: i32, shift: i32, int_res: u8, a: f32) -> i32 {
    let limit = 1i32 << (int_res - 1);
    let sgn = q.signum();
    let valid = |c: i32| c * sgn > 0 && c.abs() < limit;

    for c in [q, q + sgn, q - sgn, q + 2 * sgn, q - 2 * sgn] {
        if valid(c) && reconstruct(c, shift, int_res, a).to_bits() == x.to_bits() {
            return c;
        }
    }
    for c in [q + sgn, q, q - sgn, q - 2 * sgn] {
        if valid(c) && reconstruct(c, shift, int_res, a).abs() <= x.abs() {
            return c;
        }
    }
    0
}
