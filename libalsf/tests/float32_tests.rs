//! Float32 decomposition and bit-exact multiply
use libalsf_audio::float::float32::{
    decompose, multiply, power_of_two, recompose, step_ulps, EXP_SPECIAL, EXP_ZERO,
};

struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    // any finite float in [2^lo, 2^hi)
    fn float_in(&mut self, lo: i32, hi: i32) -> f32 {
        let r = self.next();
        let exponent = lo + (r % (hi - lo) as u64) as i32;
        let fraction = (r >> 32) as u32 & 0x7F_FFFF;
        let sign = (r >> 63) as u32;
        f32::from_bits(sign << 31 | ((exponent + 127) as u32) << 23 | fraction)
    }
}

fn product(a: f32, b: f32) -> f32 {
    recompose(multiply(decompose(a), decompose(b)))
}

fn same_bits(a: f32, b: f32) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

// ============================================================================
// Decompose / recompose
// ============================================================================

#[test]
fn test_every_class_roundtrips() {
    let values = [
        0.0f32,
        -0.0,
        1.0,
        -1.5,
        f32::MIN_POSITIVE,
        f32::from_bits(1),
        f32::from_bits(0x8000_0001),
        f32::MAX,
        f32::INFINITY,
        f32::NEG_INFINITY,
        f32::from_bits(0x7FA0_0001),
        f32::from_bits(0xFFC0_0000),
    ];
    for v in values {
        assert_eq!(recompose(decompose(v)).to_bits(), v.to_bits(), "{v:e}");
    }
}

#[test]
fn test_normal_carries_hidden_bit() {
    let v = decompose(-3.0);
    assert!(v.sign);
    assert_eq!(v.exponent, 1);
    assert_eq!(v.mantissa, 0xC0_0000);

    let sub = decompose(f32::from_bits(5));
    assert_eq!(sub.exponent, EXP_ZERO);
    assert_eq!(sub.mantissa, 5);

    assert_eq!(decompose(f32::NAN).exponent, EXP_SPECIAL);
}

// ============================================================================
// Multiply
// ============================================================================

#[test]
fn test_multiply_matches_native_for_normals() {
    let mut rng = XorShift(0x2545_F491_4F6C_DD1D);
    for _ in 0..50_000 {
        let a = rng.float_in(-20, 20);
        let b = rng.float_in(0, 1);
        assert!(same_bits(product(a, b), a * b), "{a:e} * {b:e}");
    }
}

#[test]
fn test_multiply_into_subnormals() {
    let mut rng = XorShift(0xDEAD_BEEF);
    for _ in 0..50_000 {
        let a = rng.float_in(-126, -110);
        let b = rng.float_in(-30, 0);
        assert!(same_bits(product(a, b), a * b), "{a:e} * {b:e}");
    }
}

#[test]
fn test_multiply_with_subnormal_inputs() {
    let mut rng = XorShift(12345);
    for _ in 0..20_000 {
        let a = f32::from_bits((rng.next() as u32) & 0x807F_FFFF);
        let b = rng.float_in(0, 40);
        assert!(same_bits(product(a, b), a * b), "{a:e} * {b:e}");
    }
}

#[test]
fn test_multiply_overflow_and_specials() {
    assert_eq!(product(f32::MAX, 2.0), f32::INFINITY);
    assert_eq!(product(-f32::MAX, 1.5), f32::NEG_INFINITY);
    assert!(product(f32::INFINITY, 0.0).is_nan());
    assert_eq!(product(-0.0, 3.0).to_bits(), (-0.0f32).to_bits());
    assert_eq!(product(f32::NEG_INFINITY, -2.0), f32::INFINITY);
}

#[test]
fn test_multiply_rounds_ties_to_even() {
    // 1 + 2^-23 squared sits just above a tie
    let x = step_ulps(1.0, 1);
    assert!(same_bits(product(x, x), x * x));
    let y = step_ulps(1.5, 1);
    assert!(same_bits(product(y, 1.5), y * 1.5));
}

// ============================================================================
// Powers of two
// ============================================================================

#[test]
fn test_power_of_two_range() {
    assert_eq!(power_of_two(0), 1.0);
    assert_eq!(power_of_two(-1), 0.5);
    assert_eq!(power_of_two(127), 2f32.powi(127));
    assert_eq!(power_of_two(-149), f32::from_bits(1));
    assert_eq!(power_of_two(-130), f32::from_bits(1 << 19));
    assert_eq!(power_of_two(128), f32::INFINITY);
    assert_eq!(power_of_two(-150), 0.0);
}
