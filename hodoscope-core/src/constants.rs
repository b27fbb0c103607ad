//! Physical constants and sentinel values shared across the pipeline.
//!
//! Sentinels are kept distinct from any physical measurement so that
//! downstream consumers can tell "not measured" from "measured zero".

/// Speed of light in cm/ns.
pub const SPEED_OF_LIGHT: f64 = 29.979;

/// Large "invalid" marker used for unset times and positions.
pub const BIG: f64 = 1.0e38;

/// ADC integral reported for a side without a matched pulse.
pub const NO_ADC_INTEGRAL: f64 = -999.0;

/// Reference amplitude at which the time-walk correction vanishes.
pub const TIME_WALK_REFERENCE_AMPLITUDE: f64 = 200.0;

/// Floor applied to the ADC integral before the inverse-sqrt correction.
pub const INVADC_MIN_INTEGRAL: f64 = 0.4;

/// Regression denominators at or below this magnitude are degenerate.
pub const FIT_DENOMINATOR_EPSILON: f64 = 1.0e-10;

/// Event start time before estimation.
pub const START_TIME_UNSET: f64 = -1000.0;

/// Per-plane focal-plane time before estimation.
pub const PLANE_FP_TIME_UNSET: f64 = -1.0e4;

/// Track-level focal-plane time when no hit contributed.
pub const FP_TIME_ALL_UNSET: f64 = -1000.0;

/// Chi-square of a fit that has not been attempted yet.
pub const CHISQ_NOT_FITTED: f64 = -3.0;

/// Chi-square when the hits do not cover both views.
pub const CHISQ_INSUFFICIENT_PLANES: f64 = -1.0;

/// Chi-square when the regression denominator vanishes.
pub const CHISQ_DEGENERATE: f64 = -2.0;

/// Clusters larger than this are reported as suspicious.
pub const MAX_EXPECTED_CLUSTER_SIZE: usize = 10;

/// Per-track sentinel for a plane without good hits: `1000 * (plane + 1)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn empty_plane_fp_time(plane_index: usize) -> f64 {
    1000.0 * (plane_index as f64 + 1.0)
}
