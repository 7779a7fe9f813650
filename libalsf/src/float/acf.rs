//! Common multiplier (ACF) search
//!
//! Samples that are all integer multiples of some factor `a` quantize to
//! short integers with no residual once divided by `a`. The search looks at
//! the ratios between the largest samples, recovers the smallest fractions
//! that explain them, and turns the common denominator back into `a`.

use std::collections::HashMap;

use tracing::debug;

use super::float32::{decompose, floor_log2, step_ulps, EXP_ZERO};
use super::quantize::{is_identity, quantize_channel};
use crate::config::AcfMode;

/// Largest samples examined per frame.
pub const MAX_CANDIDATES: usize = 256;

/// Samples tried as the reference of the ratios.
pub const MAX_REFERENCES: usize = 5;

/// A denominator is accepted when `candidates < MATCH_THRESHOLD * matches`.
pub const MATCH_THRESHOLD: usize = 100;

/// Continued fraction depth before a ratio is declared irrational.
pub const MAX_FRACTION_DEPTH: u32 = 32;

/// Denominators above this are treated as noise.
pub const MAX_DENOMINATOR: u64 = 1 << 20;

/// Relative tolerance on a ratio of two rounded samples.
pub const RATIO_TOLERANCE: f64 = 1.0 / (1u64 << 21) as f64;

/// Relaxed mode: total residual bits must stay below this many per sample.
pub const RELAXED_SCORE_FACTOR: u64 = 3;

/// Relaxed mode: mismatching samples must stay below frame / this, so
/// frames shorter than this never take a relaxed multiplier.
pub const RELAXED_MISMATCH_DIVISOR: usize = 24;

/// Neighbours of an estimate tried, in last places each way.
pub const NEIGHBOUR_ULPS: i32 = 2;

/// Whether `a` reproduces `samples` well enough for `mode`.
pub fn check_acf(samples: &[f32], a: f32, int_res: u8, mode: AcfMode) -> bool {
    if !(1.0..2.0).contains(&a) {
        return false;
    }
    let q = quantize_channel(samples, a, int_res, None);
    let mismatches = q.mismatches(samples);
    match mode {
        AcfMode::Strict => mismatches == 0,
        AcfMode::ResidualAllowed => {
            let frame = samples.len();
            q.residual_score() < RELAXED_SCORE_FACTOR * frame as u64
                && mismatches < frame / RELAXED_MISMATCH_DIVISOR
        }
    }
}

/// Propose a multiplier for `samples`; `1.0` when nothing validates.
pub fn estimate_acf(samples: &[f32], int_res: u8, mode: AcfMode) -> f32 {
    let candidates = largest_magnitudes(samples);
    if candidates.len() < 2 {
        return 1.0;
    }

    for reference in 0..candidates.len().min(MAX_REFERENCES) {
        let Some(a) = estimate_from_reference(&candidates, reference) else {
            continue;
        };
        if is_identity(a) {
            // dyadic data, the integers already carry it exactly
            continue;
        }
        for offset in neighbour_offsets() {
            let candidate = step_ulps(a, offset);
            if is_identity(candidate) || !(1.0..2.0).contains(&candidate) {
                continue;
            }
            if check_acf(samples, candidate, int_res, mode) {
                debug!(a = candidate, reference, offset, "acf candidate accepted");
                return candidate;
            }
        }
        debug!(a, reference, "acf candidate rejected");
    }
    1.0
}

fn neighbour_offsets() -> impl Iterator<Item = i32> {
    std::iter::once(0).chain((1..=NEIGHBOUR_ULPS).flat_map(|n| [n, -n]))
}

/// Up to `MAX_CANDIDATES` largest finite normal magnitudes, bucketed by
/// exponent distance from the peak instead of sorted.
fn largest_magnitudes(samples: &[f32]) -> Vec<f64> {
    let normal = |x: &&f32| x.is_finite() && decompose(**x).exponent != EXP_ZERO;
    let Some(peak) = samples.iter().filter(normal).map(|&x| floor_log2(x)).max() else {
        return Vec::new();
    };

    // exponents span at most 254 below the peak
    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); 256];
    for x in samples.iter().filter(normal) {
        let distance = (peak - floor_log2(*x)) as usize;
        buckets[distance.min(255)].push(x.abs() as f64);
    }

    let mut out = Vec::with_capacity(MAX_CANDIDATES);
    for bucket in buckets {
        for v in bucket {
            if out.len() == MAX_CANDIDATES {
                return out;
            }
            out.push(v);
        }
    }
    out
}

/// Common factor normalized into [1, 2), using `candidates[reference]`.
fn estimate_from_reference(candidates: &[f64], reference: usize) -> Option<f32> {
    let base = candidates[reference];
    let fractions: Vec<(usize, u64, u64)> = candidates
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != reference)
        .filter_map(|(i, &c)| {
            let ratio = c / base;
            let slack = ratio * RATIO_TOLERANCE;
            simplest_between(ratio - slack, ratio + slack, MAX_FRACTION_DEPTH)
                .filter(|&(_, q)| q <= MAX_DENOMINATOR)
                .map(|(p, q)| (i, p, q))
        })
        .collect();
    if fractions.is_empty() {
        return None;
    }

    let mut histogram: HashMap<u64, usize> = HashMap::new();
    for &(_, _, q) in &fractions {
        *histogram.entry(q).or_insert(0) += 1;
    }

    // the denominator the most fractions divide; the smaller one on ties
    let mut best: Option<(u64, usize)> = None;
    for &d in histogram.keys() {
        let matches: usize = histogram
            .iter()
            .filter(|&(&q, _)| d % q == 0)
            .map(|(_, &n)| n)
            .sum();
        best = match best {
            Some((bd, bm)) if bm > matches || (bm == matches && bd < d) => Some((bd, bm)),
            _ => Some((d, matches)),
        };
    }
    let (d, matches) = best?;
    if candidates.len() >= MATCH_THRESHOLD * matches {
        return None;
    }

    // the reference itself is d units of the factor
    let mut sum = base / d as f64;
    let mut count = 1usize;
    for &(i, p, q) in &fractions {
        if d % q == 0 {
            sum += candidates[i] / (p as f64 * (d / q) as f64);
            count += 1;
        }
    }
    normalize(sum / count as f64)
}

fn normalize(a: f64) -> Option<f32> {
    if !(a.is_finite() && a > 0.0) {
        return None;
    }
    let mut a = (a / 2f64.powi(a.log2().floor() as i32)) as f32;
    // log2 rounding at the binade edges
    while a >= 2.0 {
        a /= 2.0;
    }
    while a < 1.0 {
        a *= 2.0;
    }
    Some(a)
}

/// Simplest fraction `p/q` in `[lo, hi]`, by continued fractions.
pub fn simplest_between(lo: f64, hi: f64, depth: u32) -> Option<(u64, u64)> {
    if !(lo.is_finite() && hi.is_finite()) || lo <= 0.0 || lo > hi {
        return None;
    }
    let ceil = lo.ceil();
    if ceil <= hi {
        return Some((ceil as u64, 1));
    }
    if depth == 0 {
        return None;
    }
    let n = lo.floor();
    let (p, q) = simplest_between(1.0 / (hi - n), 1.0 / (lo - n), depth - 1)?;
    // n + q/p
    let numerator = (n as u64).checked_mul(p)?.checked_add(q)?;
    Some((numerator, p))
}
