//! Angle and unit conversions between degrees, radians, device phase steps,
//! and carrier frequency.

use std::f64::consts::TAU;

use crate::device::{PHASE_INTERVAL, PhaseSetting};
use crate::error::{BeamError, Result, check_angle};

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Rounded speed of light used by the first bench fixtures. Only for
/// reproducing those numbers; new code uses [`SPEED_OF_LIGHT`].
pub const LEGACY_SPEED_OF_LIGHT: f64 = 3.0e8;

pub fn to_radians(degrees: f64) -> f64 {
    degrees.to_radians()
}

pub fn to_degrees(radians: f64) -> f64 {
    radians.to_degrees()
}

/// Quantize a phase in radians to the nearest device step.
///
/// The angle is wrapped into `[0, 2π)`, rounded to the nearest multiple of
/// `2π/32` (ties to even), and a result of 32 folds back to 0.
///
/// Non-finite input has no meaningful step; it maps to 0. Use
/// [`checked_device_setting`] to reject it instead.
///
/// `to_device_setting(r) == to_device_setting(r + 2π)` holds only away from
/// rounding ties. Within float noise of a half step, the wrap can land on
/// either side of the tie and the two results differ by one step.
pub fn to_device_setting(radians: f64) -> PhaseSetting {
    if !radians.is_finite() {
        return PhaseSetting::ZERO;
    }
    let wrapped = radians.rem_euclid(TAU);
    let steps = (wrapped / PHASE_INTERVAL).round_ties_even() as i64;
    // 32 steps (and TAU itself, which rem_euclid can return for tiny
    // negative inputs) is a full turn
    PhaseSetting::wrapping(steps)
}

/// [`to_device_setting`], rejecting NaN and infinities.
pub fn checked_device_setting(radians: f64) -> Result<PhaseSetting> {
    check_angle("to_device_setting", radians)?;
    Ok(to_device_setting(radians))
}

/// Phase in radians represented by a device step, in `[0, 2π)`.
pub fn setting_to_radians(setting: PhaseSetting) -> f64 {
    f64::from(setting.value()) * PHASE_INTERVAL
}

/// Free-space wavelength in meters for a carrier frequency in Hz.
pub fn wavelength_from_frequency(hz: f64) -> Result<f64> {
    if hz.is_finite() && hz > 0.0 {
        Ok(SPEED_OF_LIGHT / hz)
    } else {
        Err(BeamError::InvalidFrequency { op: "wavelength_from_frequency", value: hz })
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn quantize_known_angles() {
        assert_eq!(to_device_setting(0.0).value(), 0);
        assert_eq!(to_device_setting(PI).value(), 16);
        assert_eq!(to_device_setting(PI / 2.0).value(), 8);
        assert_eq!(to_device_setting(-PI / 2.0).value(), 24);
        assert_eq!(to_device_setting(PHASE_INTERVAL * 3.4).value(), 3);
        assert_eq!(to_device_setting(PHASE_INTERVAL * 3.6).value(), 4);
    }

    #[test]
    fn folds_top_step_to_zero() {
        // 31.7 steps rounds to 32, which is a full turn
        assert_eq!(to_device_setting(PHASE_INTERVAL * 31.7).value(), 0);
        assert_eq!(to_device_setting(TAU - 1e-12).value(), 0);
        assert_eq!(to_device_setting(-1e-18).value(), 0);
    }

    #[test]
    fn non_finite_rejected_by_checked_variant() {
        assert!(checked_device_setting(f64::NAN).is_err());
        assert!(checked_device_setting(f64::NEG_INFINITY).is_err());
        assert_eq!(checked_device_setting(PI).unwrap().value(), 16);
    }

    #[test]
    fn setting_radians_inverse() {
        for step in 0..32 {
            let s = PhaseSetting::new(step).unwrap();
            assert_eq!(to_device_setting(setting_to_radians(s)), s);
        }
    }

    #[test]
    fn wavelength_at_28ghz() {
        let w = wavelength_from_frequency(28e9).unwrap();
        assert!((w - 0.010_706_873).abs() < 1e-9, "got {w}");
        assert!(wavelength_from_frequency(0.0).is_err());
        assert!(wavelength_from_frequency(-1.0).is_err());
    }

    proptest! {
        #[test]
        fn device_setting_is_periodic(r in -100.0f64..100.0) {
            // Skip points within float noise of a rounding boundary
            let frac = (r.rem_euclid(TAU) / PHASE_INTERVAL).fract();
            prop_assume!((frac - 0.5).abs() > 1e-6);
            prop_assert_eq!(to_device_setting(r), to_device_setting(r + TAU));
        }

        #[test]
        fn device_setting_off_by_at_most_one_step_per_turn(k in -3200i64..3200) {
            // Exact half steps, where the wrap may fall on either side of the tie
            let r = (k as f64 + 0.5) * PHASE_INTERVAL;
            let a = i32::from(to_device_setting(r).value());
            let b = i32::from(to_device_setting(r + TAU).value());
            let diff = (a - b).rem_euclid(32);
            prop_assert!(diff <= 1 || diff == 31, "{a} vs {b}");
        }

        #[test]
        fn device_setting_in_range(r in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            prop_assert!(to_device_setting(r).value() < 32);
        }
    }
}
