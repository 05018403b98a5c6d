//! Safe casting utilities for turning filter output into pixel coordinates

use crate::{Error, Result};

/// Safely convert u32 to i32 with overflow checking
///
/// # Errors
///
/// Returns an error if the value exceeds i32::MAX
pub fn u32_to_i32(value: u32) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Round and clamp f64 to i32 for pixel coordinates.
///
/// Non-finite values map to `fallback` (itself clamped into `[min, max]`).
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
pub fn f64_to_i32_clamp(value: f64, min: i32, max: i32, fallback: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return fallback.clamp(min, max);
    }

    let clamped = value.round().clamp(f64::from(min), f64::from(max));
    (clamped as i32).clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_u32_to_i32() {
        assert_eq!(u32_to_i32(42).unwrap(), 42);
        assert_eq!(u32_to_i32(0).unwrap(), 0);
        assert_eq!(u32_to_i32(i32::MAX as u32).unwrap(), i32::MAX);
        assert!(u32_to_i32(i32::MAX as u32 + 1).is_err());
        assert!(u32_to_i32(u32::MAX).is_err());
    }

    #[test]
    fn test_f64_to_i32_clamp() {
        assert_eq!(f64_to_i32_clamp(50.4, 0, 100, 0), 50);
        assert_eq!(f64_to_i32_clamp(50.6, 0, 100, 0), 51);
        assert_eq!(f64_to_i32_clamp(-10.0, 0, 100, 0), 0);
        assert_eq!(f64_to_i32_clamp(150.0, 0, 100, 0), 100);
        assert_eq!(f64_to_i32_clamp(f64::NAN, 0, 100, 40), 40);
        assert_eq!(f64_to_i32_clamp(f64::INFINITY, 0, 100, 400), 100);
    }

    #[test]
    fn test_f64_to_i32_clamp_negative_origin() {
        // Monitors left of the primary have negative origins
        assert_eq!(f64_to_i32_clamp(-500.2, -1920, -1, 0), -500);
        assert_eq!(f64_to_i32_clamp(10.0, -1920, -1, 0), -1);
        assert_eq!(f64_to_i32_clamp(f64::NAN, -1920, -1, 0), -1);
    }

    proptest! {
        #[test]
        fn prop_f64_to_i32_clamp_always_within_bounds(
            value in any::<f64>(),
            min in any::<i32>(),
            max in any::<i32>(),
            fallback in any::<i32>()
        ) {
            let (min, max) = if min <= max { (min, max) } else { (max, min) };
            let result = f64_to_i32_clamp(value, min, max, fallback);
            prop_assert!(result >= min);
            prop_assert!(result <= max);
        }
    }
}
