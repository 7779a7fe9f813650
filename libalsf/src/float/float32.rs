//! Bit-exact IEEE-754 single precision helpers
//!
//! `multiply` reproduces the hardware product (round to nearest, ties to
//! even) from the integer mantissas so the encoder can predict exactly what
//! the decoder will compute.

/// Exponent sentinel for zero and subnormals (mantissa holds the raw bits).
pub const EXP_ZERO: i32 = -127;
/// Exponent sentinel for infinities and NaNs (mantissa holds the payload).
pub const EXP_SPECIAL: i32 = 128;

const MANTISSA_BITS: u32 = 23;
const HIDDEN_BIT: u32 = 1 << MANTISSA_BITS;
const FRACTION_MASK: u32 = HIDDEN_BIT - 1;
/// Smallest normal exponent.
pub const MIN_EXPONENT: i32 = -126;
/// Unit exponent of the smallest subnormal.
const MIN_UNIT_EXPONENT: i32 = MIN_EXPONENT - MANTISSA_BITS as i32;

/// A float split into sign, unbiased exponent and 24-bit mantissa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Float32Value {
    pub sign: bool,
    pub exponent: i32,
    pub mantissa: u32,
}

impl Float32Value {
    pub fn is_special(&self) -> bool {
        self.exponent == EXP_SPECIAL
    }

    pub fn is_zero(&self) -> bool {
        self.exponent == EXP_ZERO && self.mantissa == 0
    }

    /// `(mantissa, exponent)` with value `mantissa * 2^(exponent - 23)`;
    /// subnormals and zero report the smallest normal exponent.
    pub fn ulp_form(&self) -> (u32, i32) {
        if self.exponent == EXP_ZERO {
            (self.mantissa, MIN_EXPONENT)
        } else {
            (self.mantissa, self.exponent)
        }
    }
}

pub fn decompose(value: f32) -> Float32Value {
    let bits = value.to_bits();
    let sign = bits >> 31 != 0;
    let biased = ((bits >> MANTISSA_BITS) & 0xFF) as i32;
    let fraction = bits & FRACTION_MASK;

    match biased {
        0 => Float32Value {
            sign,
            exponent: EXP_ZERO,
            mantissa: fraction,
        },
        0xFF => Float32Value {
            sign,
            exponent: EXP_SPECIAL,
            mantissa: fraction,
        },
        _ => Float32Value {
            sign,
            exponent: biased - 127,
            mantissa: fraction | HIDDEN_BIT,
        },
    }
}

pub fn recompose(value: Float32Value) -> f32 {
    let sign = (value.sign as u32) << 31;
    let biased = match value.exponent {
        EXP_ZERO => 0,
        EXP_SPECIAL => 0xFF,
        e => (e + 127) as u32,
    };
    f32::from_bits(sign | (biased << MANTISSA_BITS) | (value.mantissa & FRACTION_MASK))
}

/// Product of two floats, rounded exactly as the native multiply rounds.
pub fn multiply(a: Float32Value, b: Float32Value) -> Float32Value {
    if a.is_special() || b.is_special() || a.is_zero() || b.is_zero() {
        return decompose(recompose(a) * recompose(b));
    }
    let sign = a.sign ^ b.sign;
    let (ma, ea) = a.ulp_form();
    let (mb, eb) = b.ulp_form();

    let product = ma as u64 * mb as u64;
    let unit = ea + eb - 2 * MANTISSA_BITS as i32;
    let length = (64 - product.leading_zeros()) as i32;

    // keep 24 significant bits, or fewer when the result lands below the
    // normal range
    let rshift = (length - 24).max(MIN_UNIT_EXPONENT - unit);
    let mut q = round_shift(product, rshift);
    let mut unit = unit + rshift;

    if q >= 1 << 24 {
        q >>= 1;
        unit += 1;
    }
    compose_from_unit(sign, q, unit)
}

// product >> shift, rounding half to even; negative shifts are exact.
fn round_shift(product: u64, shift: i32) -> u64 {
    if shift <= 0 {
        return product << (-shift) as u32;
    }
    if shift >= 64 {
        return 0;
    }
    let q = product >> shift;
    let rem = product & ((1u64 << shift) - 1);
    let half = 1u64 << (shift - 1);
    if rem > half || (rem == half && q & 1 == 1) {
        q + 1
    } else {
        q
    }
}

// value = q * 2^unit with q < 2^24 and unit >= -149 once q is subnormal
fn compose_from_unit(sign: bool, q: u64, unit: i32) -> Float32Value {
    if q == 0 {
        return Float32Value {
            sign,
            exponent: EXP_ZERO,
            mantissa: 0,
        };
    }
    if q < HIDDEN_BIT as u64 {
        return Float32Value {
            sign,
            exponent: EXP_ZERO,
            mantissa: q as u32,
        };
    }
    let exponent = unit + MANTISSA_BITS as i32;
    if exponent > 127 {
        return Float32Value {
            sign,
            exponent: EXP_SPECIAL,
            mantissa: 0,
        };
    }
    Float32Value {
        sign,
        exponent,
        mantissa: q as u32,
    }
}

/// Candidate quotients are re-checked through `multiply`, so native
/// division is enough here.
pub fn divide(x: f32, a: f32) -> f32 {
    x / a
}

/// 2^shift, saturating to infinity or flushing to zero outside the float
/// range.
pub fn power_of_two(shift: i32) -> f32 {
    if (MIN_EXPONENT..=127).contains(&shift) {
        return f32::from_bits(((shift + 127) as u32) << MANTISSA_BITS);
    }
    let mut value: f32;
    let mut rest: i32;
    if shift > 0 {
        value = f32::from_bits(254 << MANTISSA_BITS);
        rest = shift - 127;
        while rest > 0 && value.is_finite() {
            value *= 2.0;
            rest -= 1;
        }
    } else {
        value = f32::from_bits(1 << MANTISSA_BITS);
        rest = shift - MIN_EXPONENT;
        while rest < 0 && value != 0.0 {
            value *= 0.5;
            rest += 1;
        }
    }
    value
}

/// 2^e as an f64; exact for every exponent the codec produces.
pub fn exp2_f64(e: i32) -> f64 {
    debug_assert!((-1022..=1023).contains(&e));
    f64::from_bits(((e + 1023) as u64) << 52)
}

/// `x * 2^e` with a single rounding.
pub fn scale_by_power_of_two(x: f32, e: i32) -> f32 {
    (x as f64 * exp2_f64(e)) as f32
}

/// floor(log2(|x|)) for finite nonzero `x`.
pub fn floor_log2(x: f32) -> i32 {
    let v = decompose(x);
    if v.exponent == EXP_ZERO {
        let length = 32 - v.mantissa.leading_zeros() as i32;
        length - 1 + MIN_UNIT_EXPONENT
    } else {
        v.exponent
    }
}

/// Next float away from zero in the same binade direction (bit pattern + n).
pub fn step_ulps(x: f32, n: i32) -> f32 {
    f32::from_bits((x.to_bits() as i64 + n as i64) as u32)
}
