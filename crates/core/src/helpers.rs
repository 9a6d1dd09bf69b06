// SPDX-License-Identifier: MIT

//!
//! Helper functions
//!

/// Linear interpolation from `from` (ratio `0.0`) to `to` (ratio `1.0`).
///
/// Both ends are exact: a ratio of `0.0` gives back `from` and a ratio of
/// `1.0` or more gives back `to`, bit for bit.
pub fn lerp(from: f64, to: f64, ratio: f64) -> f64 {
    if ratio >= 1.0 {
        to
    } else {
        from + (to - from) * ratio
    }
}

/// Clamp an animation ratio into `0.0..=1.0` (NaN becomes `0.0`)
pub fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.1, 0.3, 0.0), 0.1);
        assert_eq!(lerp(0.1, 0.3, 1.0), 0.3);
        assert_eq!(lerp(-10.0, 10.0, 0.25), -5.0);
    }

    #[test]
    fn test_clamp_ratio() {
        assert_eq!(clamp_ratio(-0.5), 0.0);
        assert_eq!(clamp_ratio(1.5), 1.0);
        assert_eq!(clamp_ratio(f64::NAN), 0.0);
        assert_eq!(clamp_ratio(0.5), 0.5);
    }
}
