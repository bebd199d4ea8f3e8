//! Precision policies.
//!
//! Rounding used to quantize viewport edges (`round_to`) and a total float
//! ordering for nearest-candidate ties (`stable_total_cmp_f64`).

use core::cmp::Ordering;

/// Round `v` to the nearest multiple of `precision`.
///
/// Non-positive or non-finite precision leaves the value untouched.
pub fn round_to(v: f64, precision: f64) -> f64 {
    if !(precision.is_finite() && precision > 0.0) || !v.is_finite() {
        return v;
    }
    if precision < 1.0 {
        // Divide by an integral scale so 1e-6 grids land on the shortest decimal.
        let scale = (1.0 / precision).round();
        return canonical_f64((v * scale).round() / scale);
    }
    canonical_f64((v / precision).round() * precision)
}

/// Canonicalize a floating-point value for deterministic ordering.
///
/// Rules:
/// - `-0.0` becomes `0.0`
/// - all NaNs become a single canonical NaN
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        // Handles +0.0 and -0.0.
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Deterministic total ordering for floats.
///
/// Prefer this any time you sort floats or use them in ordered keys.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

#[cfg(test)]
mod tests {
    use super::{canonical_f64, round_to, stable_total_cmp_f64};
    use core::cmp::Ordering;

    #[test]
    fn canonicalizes_negative_zero() {
        assert_eq!(canonical_f64(-0.0), 0.0);
        assert_eq!(canonical_f64(0.0), 0.0);
    }

    #[test]
    fn stable_cmp_is_total_and_deterministic() {
        assert_eq!(stable_total_cmp_f64(1.0, 2.0), Ordering::Less);
        assert_eq!(stable_total_cmp_f64(f64::NAN, f64::NAN), Ordering::Equal);
        assert_eq!(stable_total_cmp_f64(-0.0, 0.0), Ordering::Equal);
    }

    #[test]
    fn round_to_snaps_to_grid() {
        assert_eq!(round_to(53.123_456_78, 1e-6), 53.123_457);
        assert_eq!(round_to(-0.000_000_1, 1e-6), 0.0);
        assert_eq!(round_to(1.5, 0.0), 1.5);
        assert!(round_to(f64::NAN, 1e-6).is_nan());
    }
}
