//! Time-walk and pulse-height correction formulas.
//!
//! These are shared by the hit extractor, which works with the bar
//! position estimated from the two PMT times, and the per-track fitter,
//! which uses the track-projected position instead.

use hodoscope_core::constants::{INVADC_MIN_INTEGRAL, TIME_WALK_REFERENCE_AMPLITUDE};
use hodoscope_core::{PaddleCalibration, Side, SideCalibration};

/// Power-law time walk `(A/thr)^-c2 - (200/thr)^-c2`.
///
/// Zero at the reference amplitude for any `c2`. A non-positive
/// amplitude gives no correction.
#[must_use]
pub fn time_walk(amplitude: f64, threshold: f64, c2: f64) -> f64 {
    if amplitude <= 0.0 {
        return 0.0;
    }
    (amplitude / threshold).powf(-c2) - (TIME_WALK_REFERENCE_AMPLITUDE / threshold).powf(-c2)
}

/// Inverse-sqrt ADC slewing term plus the side's constant offset.
#[must_use]
pub fn inverse_adc_term(cal: &SideCalibration, adc: f64) -> f64 {
    cal.invadc_offset + cal.invadc_adc / adc.max(INVADC_MIN_INTEGRAL).sqrt()
}

/// Pulse-height corrected time in inverse-ADC mode, before light propagation.
#[must_use]
pub fn inverse_adc_time(time: f64, cal: &SideCalibration, adc: f64) -> f64 {
    time - inverse_adc_term(cal, adc)
}

/// Paddle offset applied after the time walk in FADC mode.
///
/// The negative side also carries twice the cable delay.
#[must_use]
pub fn fadc_offset(cal: &PaddleCalibration, side: Side) -> f64 {
    match side {
        Side::Positive => cal.lambda_coeff,
        Side::Negative => cal.lambda_coeff - 2.0 * cal.cable_fit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_time_walk_vanishes_at_reference_amplitude() {
        for c2 in [0.0, 0.1, 0.33, 0.5, 1.0, 2.7] {
            for threshold in [1.0, 4.0, 25.0] {
                assert_relative_eq!(time_walk(200.0, threshold, c2), 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_time_walk_sign() {
        // small pulses cross the threshold late
        assert!(time_walk(50.0, 1.0, 0.5) > 0.0);
        assert!(time_walk(800.0, 1.0, 0.5) < 0.0);
        assert_relative_eq!(time_walk(-3.0, 1.0, 0.5), 0.0);
        assert_relative_eq!(time_walk(0.0, 1.0, 0.5), 0.0);
    }

    #[test]
    fn test_time_walk_value() {
        let expected = 0.5f64.powf(-0.5) - 2.0f64.powf(-0.5);
        assert_relative_eq!(time_walk(50.0, 100.0, 0.5), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_adc_floor() {
        let cal = SideCalibration {
            invadc_offset: 1.0,
            invadc_adc: 2.0,
            ..SideCalibration::default()
        };
        let floored = 1.0 + 2.0 / 0.4f64.sqrt();
        assert_relative_eq!(inverse_adc_term(&cal, -999.0), floored);
        assert_relative_eq!(inverse_adc_term(&cal, 100.0), 1.2);
        assert_relative_eq!(inverse_adc_time(10.0, &cal, 100.0), 8.8);
    }

    #[test]
    fn test_fadc_offset() {
        let cal = PaddleCalibration {
            lambda_coeff: 1.5,
            cable_fit: 0.25,
            ..PaddleCalibration::default()
        };
        assert_relative_eq!(fadc_offset(&cal, Side::Positive), 1.5);
        assert_relative_eq!(fadc_offset(&cal, Side::Negative), 1.0);
    }
}
