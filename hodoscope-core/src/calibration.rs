//! Per-paddle calibration constants keyed by `(plane, paddle)`.
//!
//! Parameter files store these as flat arrays indexed by the composite
//! scintillator index `n_planes * paddle_index + plane_index`. The table
//! unpacks them once at configuration time so that nothing downstream
//! does index arithmetic.

use serde::{Deserialize, Serialize};

use crate::hit::Side;

/// Which timing correction model is in use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeCorrectionMode {
    /// Offset, inverse-sqrt ADC and linear light-propagation terms.
    #[default]
    InverseAdc,
    /// Power-law time walk with cable, lambda and velocity-fit terms.
    Fadc,
}

/// Constants for one PMT.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SideCalibration {
    /// Timing resolution used with [`TimeCorrectionMode::InverseAdc`].
    pub sigma: f64,
    /// Timing resolution used with [`TimeCorrectionMode::Fadc`].
    pub fadc_sigma: f64,
    pub invadc_offset: f64,
    /// Effective light velocity for the linear propagation term.
    pub invadc_linear: f64,
    pub invadc_adc: f64,
    /// Lower edge of the TDC − ADC time coincidence window (ns).
    pub adc_window_min: f64,
    /// Upper edge of the TDC − ADC time coincidence window (ns).
    pub adc_window_max: f64,
    pub walk_c1: f64,
    /// Time-walk exponent.
    pub walk_c2: f64,
}

impl Default for SideCalibration {
    fn default() -> Self {
        Self {
            sigma: 0.2,
            fadc_sigma: 0.2,
            invadc_offset: 0.0,
            invadc_linear: 15.0,
            invadc_adc: 0.0,
            adc_window_min: -1000.0,
            adc_window_max: 1000.0,
            walk_c1: 0.0,
            walk_c2: 0.0,
        }
    }
}

impl SideCalibration {
    /// Timing resolution for the active correction mode.
    #[must_use]
    pub fn timing_sigma(&self, mode: TimeCorrectionMode) -> f64 {
        match mode {
            TimeCorrectionMode::InverseAdc => self.sigma,
            TimeCorrectionMode::Fadc => self.fadc_sigma,
        }
    }

    /// Is `diff` strictly inside the ADC/TDC coincidence window?
    #[must_use]
    pub fn in_adc_window(&self, diff: f64) -> bool {
        diff > self.adc_window_min && diff < self.adc_window_max
    }
}

/// Constants for one paddle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaddleCalibration {
    /// Light propagation velocity in the bar (cm/ns).
    pub vel_light: f64,
    /// Fitted light propagation velocity (cm/ns).
    pub vel_fit: f64,
    /// Cable delay between the two ends (ns).
    pub cable_fit: f64,
    /// Paddle-to-paddle time offset (ns).
    pub lambda_coeff: f64,
    pub pos: SideCalibration,
    pub neg: SideCalibration,
}

impl Default for PaddleCalibration {
    fn default() -> Self {
        Self {
            vel_light: 15.0,
            vel_fit: 15.0,
            cable_fit: 0.0,
            lambda_coeff: 0.0,
            pos: SideCalibration::default(),
            neg: SideCalibration::default(),
        }
    }
}

impl PaddleCalibration {
    #[must_use]
    pub fn side(&self, side: Side) -> &SideCalibration {
        match side {
            Side::Positive => &self.pos,
            Side::Negative => &self.neg,
        }
    }

    /// Combined two-ended resolution `sqrt(σp² + σn²) / 2`.
    #[must_use]
    pub fn combined_sigma(&self, mode: TimeCorrectionMode) -> f64 {
        0.5 * self
            .pos
            .timing_sigma(mode)
            .hypot(self.neg.timing_sigma(mode))
    }
}

/// Calibration constants for every paddle of every plane.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    planes: Vec<Vec<PaddleCalibration>>,
}

impl CalibrationTable {
    /// Default constants sized for the given paddle counts.
    #[must_use]
    pub fn new(paddles_per_plane: &[usize]) -> Self {
        Self {
            planes: paddles_per_plane
                .iter()
                .map(|&n| vec![PaddleCalibration::default(); n])
                .collect(),
        }
    }

    /// Build from composite-index arrays.
    ///
    /// `lookup(composite_index)` returns the constants stored at that
    /// position of the flat parameter arrays.
    pub fn from_composite<F>(paddles_per_plane: &[usize], mut lookup: F) -> Self
    where
        F: FnMut(usize) -> PaddleCalibration,
    {
        let n_planes = paddles_per_plane.len();
        let planes = paddles_per_plane
            .iter()
            .enumerate()
            .map(|(plane, &n)| {
                (0..n)
                    .map(|paddle| lookup(composite_index(n_planes, plane, paddle)))
                    .collect()
            })
            .collect();
        Self { planes }
    }

    #[must_use]
    pub fn n_planes(&self) -> usize {
        self.planes.len()
    }

    #[must_use]
    pub fn n_paddles(&self, plane: usize) -> usize {
        self.planes.get(plane).map_or(0, Vec::len)
    }

    /// Constants for `(plane, paddle_index)`, both 0-based.
    ///
    /// # Panics
    /// Panics if either index is outside the configured detector.
    #[must_use]
    pub fn get(&self, plane: usize, paddle: usize) -> &PaddleCalibration {
        &self.planes[plane][paddle]
    }

    /// Mutable constants for `(plane, paddle_index)`.
    ///
    /// # Panics
    /// Panics if either index is outside the configured detector.
    pub fn get_mut(&mut self, plane: usize, paddle: usize) -> &mut PaddleCalibration {
        &mut self.planes[plane][paddle]
    }

    /// Apply `f` to every paddle.
    pub fn for_each_mut<F: FnMut(&mut PaddleCalibration)>(&mut self, f: F) {
        self.planes.iter_mut().flatten().for_each(f);
    }
}

/// Composite scintillator index used by the flat parameter arrays.
#[must_use]
pub fn composite_index(n_planes: usize, plane: usize, paddle: usize) -> usize {
    n_planes * paddle + plane
}
