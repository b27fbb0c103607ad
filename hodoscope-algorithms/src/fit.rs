//! Weighted least-squares fit of hit time against z.

use hodoscope_core::constants::{CHISQ_DEGENERATE, FIT_DENOMINATOR_EPSILON, SPEED_OF_LIGHT};
use hodoscope_core::FitStatus;

/// One hit entering the fit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedPoint {
    pub z: f64,
    pub time: f64,
    pub sigma: f64,
}

impl TimedPoint {
    #[must_use]
    pub fn new(z: f64, time: f64, sigma: f64) -> Self {
        Self { z, time, sigma }
    }
}

/// Result of [`fit_beta`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BetaFit {
    /// Velocity over c, 0 when degenerate.
    pub beta: f64,
    /// Time at z = 0.
    pub t0: f64,
    pub chisq: f64,
    pub status: FitStatus,
}

impl BetaFit {
    fn degenerate() -> Self {
        Self {
            beta: 0.0,
            t0: 0.0,
            chisq: CHISQ_DEGENERATE,
            status: FitStatus::Degenerate,
        }
    }
}

/// Fit `t = t0 + z / v` with weights `1/σ²` and convert `v` to beta.
///
/// `path_norm` is the path length per unit z of the track. A vanishing
/// regression denominator gives `beta = 0, chisq = -2`.
#[must_use]
pub fn fit_beta(points: &[TimedPoint], path_norm: f64) -> BetaFit {
    let mut sum_w = 0.0;
    let mut sum_z = 0.0;
    let mut sum_zz = 0.0;
    let mut sum_t = 0.0;
    let mut sum_tz = 0.0;
    for p in points {
        let w = 1.0 / (p.sigma * p.sigma);
        sum_w += w;
        sum_z += w * p.z;
        sum_zz += w * p.z * p.z;
        sum_t += w * p.time;
        sum_tz += w * p.time * p.z;
    }

    let spread = sum_w * sum_zz - sum_z * sum_z;
    let denom = sum_w * sum_tz - sum_z * sum_t;
    if !(denom.abs() > FIT_DENOMINATOR_EPSILON && spread.abs() > FIT_DENOMINATOR_EPSILON) {
        return BetaFit::degenerate();
    }

    let velocity = spread / denom;
    let t0 = (sum_t * sum_zz - sum_z * sum_tz) / spread;
    let chisq = points
        .iter()
        .map(|p| {
            let residual = p.z / velocity - (p.time - t0);
            residual * residual / (p.sigma * p.sigma)
        })
        .sum();

    BetaFit {
        beta: velocity / path_norm / SPEED_OF_LIGHT,
        t0,
        chisq,
        status: FitStatus::Fitted,
    }
}
