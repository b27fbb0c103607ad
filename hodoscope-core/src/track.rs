//! Track input and per-track time-of-flight results.

use serde::{Deserialize, Serialize};

use crate::constants::{CHISQ_NOT_FITTED, FP_TIME_ALL_UNSET};

/// A reconstructed focal-plane track supplied by the tracking detectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    pub x: f64,
    pub y: f64,
    /// dx/dz.
    pub theta: f64,
    /// dy/dz.
    pub phi: f64,
    /// Momentum (GeV/c).
    pub momentum: f64,
    /// Particle mass hypothesis (GeV/c²).
    pub mass: f64,
    /// Calorimeter energy associated with the track (GeV).
    pub energy: f64,
}

impl Track {
    #[must_use]
    pub fn new(x: f64, y: f64, theta: f64, phi: f64) -> Self {
        Self {
            x,
            y,
            theta,
            phi,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_momentum(mut self, momentum: f64, mass: f64) -> Self {
        self.momentum = momentum;
        self.mass = mass;
        self
    }

    #[must_use]
    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = energy;
        self
    }

    /// Velocity for the mass hypothesis.
    #[must_use]
    pub fn beta(&self) -> f64 {
        self.momentum / self.momentum.hypot(self.mass)
    }

    /// Path length per unit z.
    #[must_use]
    pub fn path_norm(&self) -> f64 {
        (1.0 + self.theta * self.theta + self.phi * self.phi).sqrt()
    }

    /// Track (x, y) at `z`.
    #[must_use]
    pub fn position_at(&self, z: f64) -> (f64, f64) {
        (self.x + self.theta * z, self.y + self.phi * z)
    }

    /// Calorimeter energy over momentum.
    #[must_use]
    pub fn normalized_energy(&self) -> f64 {
        self.energy / self.momentum
    }
}

/// Hit quality flags for one (track, plane, hit).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodFlags {
    pub on_track: bool,
    pub good_scin_time: bool,
    pub good_tdc_pos: bool,
    pub good_tdc_neg: bool,
}

/// Working record for one hit while fitting one track.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TofHitInfo {
    pub plane: usize,
    /// Index of the hit within its plane.
    pub hit: usize,
    pub paddle: u32,
    pub on_track: bool,
    pub keep_pos: bool,
    pub keep_neg: bool,
    pub z: f64,
    /// Flight time from the reference plane to `z` along the track.
    pub zcor: f64,
    pub path_pos: f64,
    pub path_neg: f64,
    /// Raw TDC time (ns) of each side, if in window.
    pub tdc_time_pos: Option<f64>,
    pub tdc_time_neg: Option<f64>,
    pub adc_pos: f64,
    pub adc_neg: f64,
    /// Corrected time at the paddle.
    pub scin_pos_time: f64,
    pub scin_neg_time: f64,
    /// Corrected time projected back to the reference plane.
    pub time_pos: f64,
    pub time_neg: f64,
}

impl TofHitInfo {
    #[must_use]
    pub fn new(plane: usize, hit: usize, paddle: u32) -> Self {
        Self {
            plane,
            hit,
            paddle,
            on_track: false,
            keep_pos: false,
            keep_neg: false,
            z: 0.0,
            zcor: 0.0,
            path_pos: 0.0,
            path_neg: 0.0,
            tdc_time_pos: None,
            tdc_time_neg: None,
            adc_pos: 0.0,
            adc_neg: 0.0,
            scin_pos_time: 0.0,
            scin_neg_time: 0.0,
            time_pos: -99.0,
            time_neg: -99.0,
        }
    }
}

/// Outcome of a beta fit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    #[default]
    NotFitted,
    Fitted,
    /// Regression denominator vanished.
    Degenerate,
    /// No good plane in one of the views.
    InsufficientPlanes,
}

/// Per-track time-of-flight result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackTof {
    pub beta: f64,
    pub beta_chisq: f64,
    pub fit_status: FitStatus,
    /// Mean focal-plane time of the good hits, 0 when there are none.
    pub fp_time: f64,
    /// Same mean, [`FP_TIME_ALL_UNSET`] when there are none.
    pub fp_time_all: f64,
    /// dE/dx of the first good hit.
    pub dedx: f64,
    pub n_pmt_hit: u32,
    pub n_scin_hit: usize,
    pub good_plane_time: Vec<bool>,
    pub plane_fp_time: Vec<f64>,
    /// One entry per good hit, in processing order.
    pub dedx_per_hit: Vec<f64>,
    /// `good_flags[plane][hit]`, one entry per hit of the plane.
    pub good_flags: Vec<Vec<GoodFlags>>,
    pub good_plane3: bool,
    pub good_plane4: bool,
    #[serde(skip)]
    pub hit_info: Vec<TofHitInfo>,
}

impl Default for TrackTof {
    fn default() -> Self {
        Self {
            beta: 0.0,
            beta_chisq: CHISQ_NOT_FITTED,
            fit_status: FitStatus::NotFitted,
            fp_time: 0.0,
            fp_time_all: FP_TIME_ALL_UNSET,
            dedx: 0.0,
            n_pmt_hit: 0,
            n_scin_hit: 0,
            good_plane_time: Vec::new(),
            plane_fp_time: Vec::new(),
            dedx_per_hit: Vec::new(),
            good_flags: Vec::new(),
            good_plane3: false,
            good_plane4: false,
            hit_info: Vec::new(),
        }
    }
}

impl TrackTof {
    /// Flags of hit `hit` in plane `plane`.
    ///
    /// # Panics
    /// Panics if the hit was not part of this fit.
    #[must_use]
    pub fn flags(&self, plane: usize, hit: usize) -> GoodFlags {
        self.good_flags[plane][hit]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_track_kinematics() {
        let track = Track::new(1.0, -2.0, 0.03, 0.04).with_momentum(3.0, 4.0);
        assert_relative_eq!(track.beta(), 0.6);
        assert_relative_eq!(track.path_norm(), (1.0025_f64).sqrt());

        let (x, y) = track.position_at(100.0);
        assert_relative_eq!(x, 4.0);
        assert_relative_eq!(y, 2.0);
    }

    #[test]
    fn test_track_tof_defaults_are_sentinels() {
        let tof = TrackTof::default();
        assert_relative_eq!(tof.beta_chisq, -3.0);
        assert_relative_eq!(tof.fp_time_all, -1000.0);
        assert_eq!(tof.fit_status, FitStatus::NotFitted);
    }
}
