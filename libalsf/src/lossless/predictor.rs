//! Fixed polynomial predictors for the integer layer
//!
//! Order `n` predicts from the previous `n` samples with binomial weights.
//! The first samples of a frame fall back to the highest order their history
//! allows, so no warm-up values are stored separately.

/// Highest order with a coefficient table.
pub const MAX_ORDER: usize = 4;

const COEFFS: [&[i64]; MAX_ORDER + 1] = [&[], &[1], &[2, -1], &[3, -3, 1], &[4, -6, 4, -1]];

#[inline]
fn predict(samples: &[i32], i: usize, order: usize) -> i64 {
    let coeffs = COEFFS[order.min(i)];
    coeffs
        .iter()
        .enumerate()
        .map(|(j, &c)| c * samples[i - j - 1] as i64)
        .sum()
}

/// Prediction residuals of `samples` for a fixed `order` (0..=4).
pub fn fixed_residuals(samples: &[i32], order: usize) -> Vec<i32> {
    let order = order.min(MAX_ORDER);
    (0..samples.len())
        .map(|i| (samples[i] as i64 - predict(samples, i, order)) as i32)
        .collect()
}

/// Inverse of `fixed_residuals`.
pub fn fixed_reconstruct(residuals: &[i32], order: usize) -> Vec<i32> {
    let order = order.min(MAX_ORDER);
    let mut samples = Vec::with_capacity(residuals.len());
    for (i, &r) in residuals.iter().enumerate() {
        let prediction = predict(&samples, i, order);
        samples.push((prediction + r as i64) as i32);
    }
    samples
}

/// Trailing zero bits common to every nonzero value.
pub fn wasted_bits(samples: &[i32]) -> u8 {
    samples
        .iter()
        .filter(|&&s| s != 0)
        .map(|s| s.trailing_zeros())
        .min()
        .unwrap_or(0) as u8
}
