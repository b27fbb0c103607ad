//! Run configuration for the hodoscope.
//!
//! [`HodoscopeConfig`] is immutable once event processing starts. It is
//! either built programmatically (tests, simulations) or loaded from a
//! [`ParamStore`] with [`HodoscopeConfig::from_params`].
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::calibration::{
    CalibrationTable, PaddleCalibration, SideCalibration, TimeCorrectionMode,
};
use crate::constants::SPEED_OF_LIGHT;
use crate::error::{Error, Result};
use crate::params::ParamStore;

/// Coordinate measured across the paddles of a plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaneView {
    /// Paddles stacked along x; the bar runs along y.
    X,
    /// Paddles stacked along y; the bar runs along x.
    Y,
}

impl PlaneView {
    /// Conventional view for a 1-based plane number (1x, 1y, 2x, 2y).
    #[must_use]
    pub fn for_plane_number(number: u32) -> Self {
        if number % 2 == 1 {
            Self::X
        } else {
            Self::Y
        }
    }

    /// Split a track position into (transverse, longitudinal) bar coordinates.
    #[must_use]
    pub fn split(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Self::X => (x, y),
            Self::Y => (y, x),
        }
    }
}

/// How the ADC integral of a side is obtained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdcMode {
    /// First pulse raw integral minus the accumulated pedestal.
    Standard,
    /// Pulse matched to the TDC time, firmware pedestal.
    #[default]
    DynamicPedestal,
    /// Raw sample integral minus the accumulated pedestal.
    SampleIntegral,
    /// Sample integral with the firmware pedestal.
    SampleIntegralDynamicPedestal,
}

impl AdcMode {
    /// Decode the integer code used in parameter files.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::Standard),
            1 => Ok(Self::DynamicPedestal),
            2 => Ok(Self::SampleIntegral),
            3 => Ok(Self::SampleIntegralDynamicPedestal),
            other => Err(Error::invalid("hodo_adc_mode", format!("unknown mode {other}"))),
        }
    }
}

/// Static geometry and plane-wide constants for one plane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneConfig {
    pub name: String,
    /// 1-based plane number as used in raw hits.
    pub number: u32,
    pub view: PlaneView,
    pub z_pos: f64,
    /// Extra z for odd (0-based) paddles, which sit in a staggered row.
    pub dz_pos: f64,
    /// Paddle width across the plane.
    pub size: f64,
    pub spacing: f64,
    /// Bar end with the positive PMT; `pos_left >= pos_right`.
    pub pos_left: f64,
    pub pos_right: f64,
    pub pos_offset: f64,
    /// Nominal centre of each paddle, 0-based.
    pub pos_center: Vec<f64>,
    /// Track matching slop added to half the paddle width.
    pub slop: f64,
    /// Added to every reference-corrected TDC value.
    pub tdc_offset: i32,
    /// Added to every ADC pulse time.
    pub adc_tdc_offset: f64,
}

impl PlaneConfig {
    /// A plane of `n_paddles` evenly spaced paddles centred on zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(name: impl Into<String>, number: u32, n_paddles: usize) -> Self {
        let spacing = 7.5;
        let half = (n_paddles as f64 - 1.0) / 2.0;
        Self {
            name: name.into(),
            number,
            view: PlaneView::for_plane_number(number),
            z_pos: 0.0,
            dz_pos: 0.0,
            size: 8.0,
            spacing,
            pos_left: 60.0,
            pos_right: -60.0,
            pos_offset: 0.0,
            pos_center: (0..n_paddles)
                .map(|i| (i as f64 - half) * spacing)
                .collect(),
            slop: 2.0,
            tdc_offset: 0,
            adc_tdc_offset: 0.0,
        }
    }

    #[must_use]
    pub fn with_z(mut self, z_pos: f64, dz_pos: f64) -> Self {
        self.z_pos = z_pos;
        self.dz_pos = dz_pos;
        self
    }

    #[must_use]
    pub fn with_edges(mut self, left: f64, right: f64) -> Self {
        self.pos_left = left;
        self.pos_right = right;
        self
    }

    #[must_use]
    pub fn with_centers(mut self, centers: Vec<f64>) -> Self {
        self.pos_center = centers;
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_slop(mut self, slop: f64) -> Self {
        self.slop = slop;
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.pos_offset = offset;
        self
    }

    #[must_use]
    pub fn with_tdc_offset(mut self, offset: i32) -> Self {
        self.tdc_offset = offset;
        self
    }

    #[must_use]
    pub fn with_adc_tdc_offset(mut self, offset: f64) -> Self {
        self.adc_tdc_offset = offset;
        self
    }

    #[must_use]
    pub fn n_paddles(&self) -> usize {
        self.pos_center.len()
    }

    /// z of a paddle, including the stagger of odd paddles.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn paddle_z(&self, index: usize) -> f64 {
        self.z_pos + (index % 2) as f64 * self.dz_pos
    }

    /// Centre of the bar along its length.
    #[must_use]
    pub fn bar_center(&self) -> f64 {
        0.5 * (self.pos_left + self.pos_right)
    }

    /// Paddle centre in detector coordinates (plane offset applied).
    ///
    /// # Panics
    /// Panics if `index` is outside the plane.
    #[must_use]
    pub fn paddle_position(&self, index: usize) -> f64 {
        self.pos_center[index] + self.pos_offset
    }
}

/// Timing constants shared by all planes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub mode: TimeCorrectionMode,
    pub adc_mode: AdcMode,
    /// Lower edge of the valid TDC window (counts).
    pub tdc_min: f64,
    /// Upper edge of the valid TDC window (counts).
    pub tdc_max: f64,
    /// TDC count to ns.
    pub tdc_to_time: f64,
    /// Half-width of the consensus time window (ns).
    pub tof_tolerance: f64,
    /// Fallback start time when no hit qualifies.
    pub start_time_center: f64,
    pub start_time_slop: f64,
    /// Nominal particle velocity for the flight-time correction.
    pub beta_nominal: f64,
    /// Discriminator threshold used to normalise the time walk.
    pub tdc_threshold: f64,
    /// Planes used for the start time and beta fits.
    pub num_planes_beta_calc: usize,
    /// Particles go backwards through the detector.
    pub cosmic: bool,
    pub pathlength_central: f64,
    /// ADC integrals at or above this are counted as diagnostic hits.
    pub adc_diag_cut: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            mode: TimeCorrectionMode::InverseAdc,
            adc_mode: AdcMode::DynamicPedestal,
            tdc_min: 0.0,
            tdc_max: 4000.0,
            tdc_to_time: 0.1,
            tof_tolerance: 3.0,
            start_time_center: 32.0,
            start_time_slop: 100.0,
            beta_nominal: 1.0,
            tdc_threshold: 1.0,
            num_planes_beta_calc: 4,
            cosmic: false,
            pathlength_central: 0.0,
            adc_diag_cut: 50.0,
        }
    }
}

impl TimingConfig {
    #[must_use]
    pub fn with_mode(mut self, mode: TimeCorrectionMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_adc_mode(mut self, adc_mode: AdcMode) -> Self {
        self.adc_mode = adc_mode;
        self
    }

    #[must_use]
    pub fn with_tdc_window(mut self, min: f64, max: f64) -> Self {
        self.tdc_min = min;
        self.tdc_max = max;
        self
    }

    #[must_use]
    pub fn with_tdc_to_time(mut self, tdc_to_time: f64) -> Self {
        self.tdc_to_time = tdc_to_time;
        self
    }

    #[must_use]
    pub fn with_tof_tolerance(mut self, tolerance: f64) -> Self {
        self.tof_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_start_time_center(mut self, center: f64) -> Self {
        self.start_time_center = center;
        self
    }

    #[must_use]
    pub fn with_beta_nominal(mut self, beta: f64) -> Self {
        self.beta_nominal = beta;
        self
    }

    #[must_use]
    pub fn with_cosmic(mut self, cosmic: bool) -> Self {
        self.cosmic = cosmic;
        self
    }

    #[must_use]
    pub fn with_num_planes_beta_calc(mut self, n: usize) -> Self {
        self.num_planes_beta_calc = n;
        self
    }

    /// Is the TDC value (counts) inside the valid window?
    #[must_use]
    pub fn tdc_in_window(&self, tdc: i32) -> bool {
        let tdc = f64::from(tdc);
        tdc >= self.tdc_min && tdc <= self.tdc_max
    }

    /// Nominal flight time from the target reference to `z`, signed so
    /// that subtracting it moves the time to the reference plane.
    #[must_use]
    pub fn nominal_flight_time(&self, z: f64) -> f64 {
        let t = z / (SPEED_OF_LIGHT * self.beta_nominal);
        if self.cosmic {
            -t
        } else {
            t
        }
    }
}

/// Pedestal accumulation constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PedestalConfig {
    /// Nominal pedestal sample size; the ceiling tightens at a fifth of it.
    pub min_events: u32,
    /// Initial ceiling for accepted samples.
    pub initial_limit: i32,
    /// Ceiling above the running average once tightened.
    pub limit_margin: i32,
    /// Threshold above the pedestal.
    pub threshold_margin: f64,
}

impl Default for PedestalConfig {
    fn default() -> Self {
        Self {
            min_events: 500,
            initial_limit: 1000,
            limit_margin: 100,
            threshold_margin: 15.0,
        }
    }
}

/// Track-independent efficiency test constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackEffConfig {
    /// Lowest paddle in acceptance for the x planes (front, back).
    pub x_lo: [u32; 2],
    pub x_hi: [u32; 2],
    pub y_lo: [u32; 2],
    pub y_hi: [u32; 2],
    /// Number of planes required (3 or 4).
    pub required_planes: u32,
    pub x_diff_max: f64,
    pub y_diff_max: f64,
    /// x'/x correlation used to project front x clusters to the back plane.
    pub xpfp_to_xfp_ratio: f64,
}

impl Default for TrackEffConfig {
    fn default() -> Self {
        Self {
            x_lo: [1, 1],
            x_hi: [16, 16],
            y_lo: [1, 1],
            y_hi: [10, 10],
            required_planes: 4,
            x_diff_max: 20.0,
            y_diff_max: 20.0,
            xpfp_to_xfp_ratio: 0.0,
        }
    }
}

impl TrackEffConfig {
    /// Acceptance paddle range `(lo, hi)` for planes 0..4 (1x, 1y, 2x, 2y).
    #[must_use]
    pub fn acceptance_paddles(&self, plane: usize) -> Option<(u32, u32)> {
        match plane {
            0 => Some((self.x_lo[0], self.x_hi[0])),
            1 => Some((self.y_lo[0], self.y_hi[0])),
            2 => Some((self.x_lo[1], self.x_hi[1])),
            3 => Some((self.y_lo[1], self.y_hi[1])),
            _ => None,
        }
    }
}

/// Cuts for the TOF calibration dump.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TofDumpConfig {
    pub enabled: bool,
    /// Shower energy / momentum window.
    pub shower_track_lo: f64,
    pub shower_track_hi: f64,
    /// Minimum Cherenkov photo-electrons.
    pub cherenkov_lo: f64,
    pub beta_lo: f64,
    pub beta_hi: f64,
}

impl Default for TofDumpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            shower_track_lo: f64::MIN,
            shower_track_hi: f64::MAX,
            cherenkov_lo: f64::MIN,
            beta_lo: f64::MIN,
            beta_hi: f64::MAX,
        }
    }
}

/// Complete, immutable hodoscope configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HodoscopeConfig {
    pub planes: Vec<PlaneConfig>,
    pub calibration: CalibrationTable,
    pub timing: TimingConfig,
    pub pedestal: PedestalConfig,
    pub track_eff: TrackEffConfig,
    pub tof_dump: TofDumpConfig,
}

impl HodoscopeConfig {
    /// Configuration with default calibration for the given planes.
    #[must_use]
    pub fn new(planes: Vec<PlaneConfig>) -> Self {
        let counts: Vec<usize> = planes.iter().map(PlaneConfig::n_paddles).collect();
        Self {
            calibration: CalibrationTable::new(&counts),
            planes,
            timing: TimingConfig::default(),
            pedestal: PedestalConfig::default(),
            track_eff: TrackEffConfig::default(),
            tof_dump: TofDumpConfig::default(),
        }
    }

    #[must_use]
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    #[must_use]
    pub fn with_pedestal(mut self, pedestal: PedestalConfig) -> Self {
        self.pedestal = pedestal;
        self
    }

    #[must_use]
    pub fn with_track_eff(mut self, track_eff: TrackEffConfig) -> Self {
        self.track_eff = track_eff;
        self
    }

    #[must_use]
    pub fn with_tof_dump(mut self, tof_dump: TofDumpConfig) -> Self {
        self.tof_dump = tof_dump;
        self
    }

    #[must_use]
    pub fn n_planes(&self) -> usize {
        self.planes.len()
    }

    /// Planes taking part in the start time and beta fits.
    #[must_use]
    pub fn n_beta_planes(&self) -> usize {
        self.timing.num_planes_beta_calc.min(self.planes.len())
    }

    /// Load from a JSON parameter file.
    pub fn from_file<P: AsRef<Path>>(path: P, prefix: &str) -> Result<Self> {
        let store = ParamStore::from_file(path)?;
        Self::from_params(&store, prefix)
    }

    /// Build the configuration from a parameter store.
    ///
    /// Every key is looked up as `prefix + name`, e.g. `hscin_1x_zpos`
    /// for prefix `h`.
    pub fn from_params(store: &ParamStore, prefix: &str) -> Result<Self> {
        let key = |name: &str| format!("{prefix}{name}");

        let n_planes = store.integer(&key("hodo_num_planes"))? as usize;
        let names: Vec<String> = store
            .text(&key("hodo_plane_names"))?
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if names.len() != n_planes {
            return Err(Error::PlaneMismatch {
                expected: n_planes,
                found: names.len(),
            });
        }
        info!("Plane name list: {}", names.join(" "));

        let slop = store.array(&key("hodo_slop"), n_planes)?;
        let tdc_offset = store.array_or(&key("hodo_tdc_offset"), n_planes, 0.0)?;
        let adc_tdc_offset = store.array_or(&key("hodo_adc_tdc_offset"), n_planes, 0.0)?;

        let mut planes = Vec::with_capacity(n_planes);
        for (i, name) in names.iter().enumerate() {
            let number = i as u32 + 1;
            let scin = |field: &str| key(&format!("scin_{name}_{field}"));
            let n_paddles = store.integer(&scin("nr"))?;
            if n_paddles <= 0 {
                return Err(Error::invalid(scin("nr"), "plane has no paddles"));
            }
            let n_paddles = n_paddles as usize;
            let (left, right) = if number == 1 || number == 3 {
                ("left", "right")
            } else {
                ("bot", "top")
            };
            planes.push(PlaneConfig {
                name: name.clone(),
                number,
                view: PlaneView::for_plane_number(number),
                z_pos: store.number(&scin("zpos"))?,
                dz_pos: store.number(&scin("dzpos"))?,
                size: store.number(&scin("size"))?,
                spacing: store.number(&scin("spacing"))?,
                pos_left: store.number(&scin(left))?,
                pos_right: store.number(&scin(right))?,
                pos_offset: store.number(&scin("offset"))?,
                pos_center: store.array(&scin("center"), n_paddles)?[..n_paddles].to_vec(),
                slop: slop[i],
                tdc_offset: tdc_offset[i] as i32,
                adc_tdc_offset: adc_tdc_offset[i],
            });
        }

        let timing = load_timing(store, prefix)?;
        let counts: Vec<usize> = planes.iter().map(PlaneConfig::n_paddles).collect();
        let calibration = load_calibration(store, prefix, &counts, timing.mode)?;

        let track_eff = TrackEffConfig {
            x_lo: paddle_pair(store, &key("xloscin"))?,
            x_hi: paddle_pair(store, &key("xhiscin"))?,
            y_lo: paddle_pair(store, &key("yloscin"))?,
            y_hi: paddle_pair(store, &key("yhiscin"))?,
            required_planes: store.integer(&key("track_eff_test_num_scin_planes"))? as u32,
            x_diff_max: store.number_or(&key("trackeff_scint_xdiff_max"), 20.0)?,
            y_diff_max: store.number_or(&key("trackeff_scint_ydiff_max"), 20.0)?,
            xpfp_to_xfp_ratio: match prefix {
                "p" => 0.0018,
                "h" => 0.0011,
                _ => 0.0,
            },
        };

        let tof_dump = TofDumpConfig {
            enabled: store.integer_or(&key("dumptof"), 0)? != 0,
            shower_track_lo: store.number_or(&key("TOFCalib_shtrk_lo"), f64::MIN)?,
            shower_track_hi: store.number_or(&key("TOFCalib_shtrk_hi"), f64::MAX)?,
            cherenkov_lo: store.number_or(&key("TOFCalib_cer_lo"), f64::MIN)?,
            beta_lo: store.number_or(&key("TOFCalib_beta_lo"), f64::MIN)?,
            beta_hi: store.number_or(&key("TOFCalib_beta_hi"), f64::MAX)?,
        };

        let pedestal = PedestalConfig {
            min_events: store.integer_or(&key("hodo_min_peds"), 500)? as u32,
            ..PedestalConfig::default()
        };

        Ok(Self {
            planes,
            calibration,
            timing,
            pedestal,
            track_eff,
            tof_dump,
        })
    }
}

/// Accept tolerances in (0.5, 10000); anything else falls back to 3 ns.
#[must_use]
pub fn sanitize_tof_tolerance(tolerance: f64) -> f64 {
    if tolerance > 0.5 && tolerance < 10_000.0 {
        tolerance
    } else {
        warn!("TOF tolerance {tolerance} out of range, using 3.0");
        3.0
    }
}

fn load_timing(store: &ParamStore, prefix: &str) -> Result<TimingConfig> {
    let key = |name: &str| format!("{prefix}{name}");
    let mode = if store.integer_or(&key("tofusinginvadc"), 1)? != 0 {
        TimeCorrectionMode::InverseAdc
    } else {
        TimeCorrectionMode::Fadc
    };
    let cosmic = store.integer_or(&key("cosmicflag"), 0)? == 1;
    if cosmic {
        info!("Hodoscope set up for cosmics");
    }
    Ok(TimingConfig {
        mode,
        adc_mode: AdcMode::from_code(store.integer_or(&key("hodo_adc_mode"), 1)?)?,
        tdc_min: store.number(&key("scin_tdc_min"))?,
        tdc_max: store.number(&key("scin_tdc_max"))?,
        tdc_to_time: store.number(&key("scin_tdc_to_time"))?,
        tof_tolerance: sanitize_tof_tolerance(store.number_or(&key("tof_tolerance"), 3.0)?),
        start_time_center: store.number(&key("start_time_center"))?,
        start_time_slop: store.number(&key("start_time_slop"))?,
        beta_nominal: store.number_or(&key("beta_nominal"), 1.0)?,
        tdc_threshold: store.number_or(&key("TDC_threshold"), 1.0)?,
        num_planes_beta_calc: store.integer_or(&key("NumPlanesBetaCalc"), 4)? as usize,
        cosmic,
        pathlength_central: store.number(&key("pathlength_central"))?,
        adc_diag_cut: store.number_or(&key("hodo_adc_diag_cut"), 50.0)?,
    })
}

fn load_calibration(
    store: &ParamStore,
    prefix: &str,
    counts: &[usize],
    mode: TimeCorrectionMode,
) -> Result<CalibrationTable> {
    let n_planes = counts.len();
    let max_paddles = counts.iter().copied().max().unwrap_or(0);
    let len = max_paddles * n_planes;
    let key = |name: &str| format!("{prefix}{name}");
    let optional = |name: &str, default: f64| store.array_or(&key(name), len, default);
    // The inverse-ADC constants are mandatory only in that mode.
    let invadc = |name: &str, default: f64| {
        if mode == TimeCorrectionMode::InverseAdc {
            store.array(&key(name), len)
        } else {
            optional(name, default)
        }
    };

    let vel_light = optional("hodo_vel_light", 15.0)?;
    let pos_sigma = optional("hodo_pos_sigma", 0.2)?;
    let neg_sigma = optional("hodo_neg_sigma", 0.2)?;
    let pos_fadc_sigma = optional("hodo_PosSigma", 0.2)?;
    let neg_fadc_sigma = optional("hodo_NegSigma", 0.2)?;
    let pos_inv_offset = invadc("hodo_pos_invadc_offset", 0.0)?;
    let neg_inv_offset = invadc("hodo_neg_invadc_offset", 0.0)?;
    let pos_inv_linear = invadc("hodo_pos_invadc_linear", 15.0)?;
    let neg_inv_linear = invadc("hodo_neg_invadc_linear", 15.0)?;
    let pos_inv_adc = invadc("hodo_pos_invadc_adc", 0.0)?;
    let neg_inv_adc = invadc("hodo_neg_invadc_adc", 0.0)?;
    let pos_win_min = optional("hodo_PosAdcTimeWindowMin", -1000.0)?;
    let pos_win_max = optional("hodo_PosAdcTimeWindowMax", 1000.0)?;
    let neg_win_min = optional("hodo_NegAdcTimeWindowMin", -1000.0)?;
    let neg_win_max = optional("hodo_NegAdcTimeWindowMax", 1000.0)?;
    let vel_fit = optional("hodo_velFit", 15.0)?;
    let cable_fit = optional("hodo_cableFit", 0.0)?;
    let lambda_coeff = optional("hodo_LCoeff", 0.0)?;
    let pos_c1 = optional("c1_Pos", 0.0)?;
    let neg_c1 = optional("c1_Neg", 0.0)?;
    let pos_c2 = optional("c2_Pos", 0.0)?;
    let neg_c2 = optional("c2_Neg", 0.0)?;

    let table = CalibrationTable::from_composite(counts, |i| PaddleCalibration {
        vel_light: vel_light[i],
        vel_fit: vel_fit[i],
        cable_fit: cable_fit[i],
        lambda_coeff: lambda_coeff[i],
        pos: SideCalibration {
            sigma: pos_sigma[i],
            fadc_sigma: pos_fadc_sigma[i],
            invadc_offset: pos_inv_offset[i],
            invadc_linear: pos_inv_linear[i],
            invadc_adc: pos_inv_adc[i],
            adc_window_min: pos_win_min[i],
            adc_window_max: pos_win_max[i],
            walk_c1: pos_c1[i],
            walk_c2: pos_c2[i],
        },
        neg: SideCalibration {
            sigma: neg_sigma[i],
            fadc_sigma: neg_fadc_sigma[i],
            invadc_offset: neg_inv_offset[i],
            invadc_linear: neg_inv_linear[i],
            invadc_adc: neg_inv_adc[i],
            adc_window_min: neg_win_min[i],
            adc_window_max: neg_win_max[i],
            walk_c1: neg_c1[i],
            walk_c2: neg_c2[i],
        },
    });
    Ok(table)
}

fn paddle_pair(store: &ParamStore, key: &str) -> Result<[u32; 2]> {
    let values = store.array(key, 2)?;
    Ok([values[0] as u32, values[1] as u32])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_plane_store() -> ParamStore {
        ParamStore::new()
            .with("hhodo_num_planes", 2.0)
            .with("hhodo_plane_names", "1x 1y")
            .with("hhodo_slop", vec![2.0, 3.0])
            .with("hscin_1x_nr", 3.0)
            .with("hscin_1x_zpos", 77.0)
            .with("hscin_1x_dzpos", 2.1)
            .with("hscin_1x_size", 8.0)
            .with("hscin_1x_spacing", 7.5)
            .with("hscin_1x_left", 60.0)
            .with("hscin_1x_right", -60.0)
            .with("hscin_1x_offset", 0.5)
            .with("hscin_1x_center", vec![-7.5, 0.0, 7.5])
            .with("hscin_1y_nr", 2.0)
            .with("hscin_1y_zpos", 97.0)
            .with("hscin_1y_dzpos", 2.1)
            .with("hscin_1y_size", 8.0)
            .with("hscin_1y_spacing", 7.5)
            .with("hscin_1y_bot", 60.0)
            .with("hscin_1y_top", -60.0)
            .with("hscin_1y_offset", 0.0)
            .with("hscin_1y_center", vec![-3.75, 3.75])
            .with("htofusinginvadc", 0.0)
            .with("hscin_tdc_min", 0.0)
            .with("hscin_tdc_max", 4000.0)
            .with("hscin_tdc_to_time", 0.1)
            .with("hstart_time_center", 32.0)
            .with("hstart_time_slop", 100.0)
            .with("hpathlength_central", 2200.0)
            .with("hxloscin", vec![1.0, 1.0])
            .with("hxhiscin", vec![3.0, 3.0])
            .with("hyloscin", vec![1.0, 1.0])
            .with("hyhiscin", vec![2.0, 2.0])
            .with("htrack_eff_test_num_scin_planes", 4.0)
            // composite index: 2 * paddle + plane
            .with("hhodo_velFit", vec![14.0, 15.0, 16.0, 17.0, 18.0, 19.0])
    }

    #[test]
    fn test_from_params_geometry_and_defaults() {
        let config = HodoscopeConfig::from_params(&two_plane_store(), "h").unwrap();

        assert_eq!(config.n_planes(), 2);
        assert_eq!(config.planes[0].name, "1x");
        assert_eq!(config.planes[0].view, PlaneView::X);
        assert_eq!(config.planes[1].view, PlaneView::Y);
        assert_eq!(config.planes[1].n_paddles(), 2);
        assert_relative_eq!(config.planes[1].pos_left, 60.0);
        assert_relative_eq!(config.planes[0].slop, 2.0);
        assert_relative_eq!(config.planes[1].slop, 3.0);

        assert_eq!(config.timing.mode, TimeCorrectionMode::Fadc);
        assert_eq!(config.timing.adc_mode, AdcMode::DynamicPedestal);
        assert_relative_eq!(config.timing.tof_tolerance, 3.0);
        assert_eq!(config.timing.num_planes_beta_calc, 4);
        assert_relative_eq!(config.track_eff.x_diff_max, 20.0);
        assert_relative_eq!(config.track_eff.xpfp_to_xfp_ratio, 0.0011);
        assert!(!config.tof_dump.enabled);

        let cal = config.calibration.get(0, 0);
        assert_relative_eq!(cal.vel_light, 15.0);
        assert_relative_eq!(cal.pos.sigma, 0.2);
        assert_relative_eq!(cal.pos.adc_window_min, -1000.0);
    }

    #[test]
    fn test_from_params_unpacks_composite_arrays() {
        let config = HodoscopeConfig::from_params(&two_plane_store(), "h").unwrap();
        // plane 1x, paddle index 2 -> 2 * 2 + 0 = 4
        assert_relative_eq!(config.calibration.get(0, 2).vel_fit, 18.0);
        // plane 1y, paddle index 1 -> 2 * 1 + 1 = 3
        assert_relative_eq!(config.calibration.get(1, 1).vel_fit, 17.0);
    }

    #[test]
    fn test_plane_name_mismatch_is_error() {
        let store = two_plane_store().with("hhodo_plane_names", "1x 1y 2x");
        let err = HodoscopeConfig::from_params(&store, "h").unwrap_err();
        assert!(matches!(
            err,
            Error::PlaneMismatch {
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn test_inverse_adc_mode_requires_constants() {
        let store = two_plane_store().with("htofusinginvadc", 1.0);
        let err = HodoscopeConfig::from_params(&store, "h").unwrap_err();
        assert!(matches!(err, Error::MissingParameter(name) if name == "hhodo_pos_invadc_offset"));
    }

    #[test]
    fn test_tof_tolerance_is_sanitized() {
        let store = two_plane_store().with("htof_tolerance", 0.1);
        let config = HodoscopeConfig::from_params(&store, "h").unwrap();
        assert_relative_eq!(config.timing.tof_tolerance, 3.0);

        assert_relative_eq!(sanitize_tof_tolerance(5.0), 5.0);
        assert_relative_eq!(sanitize_tof_tolerance(20_000.0), 3.0);
    }

    #[test]
    fn test_plane_helpers() {
        let plane = PlaneConfig::new("1x", 1, 4)
            .with_z(100.0, 2.0)
            .with_offset(1.0);

        assert_relative_eq!(plane.paddle_z(0), 100.0);
        assert_relative_eq!(plane.paddle_z(1), 102.0);
        assert_relative_eq!(plane.paddle_z(2), 100.0);
        assert_relative_eq!(plane.pos_center[0], -11.25);
        assert_relative_eq!(plane.paddle_position(3), 12.25);
        assert_relative_eq!(plane.bar_center(), 0.0);
        assert_eq!(PlaneView::Y.split(1.0, 2.0), (2.0, 1.0));
    }

    #[test]
    fn test_nominal_flight_time_sign() {
        let timing = TimingConfig::default().with_beta_nominal(1.0);
        assert_relative_eq!(timing.nominal_flight_time(SPEED_OF_LIGHT), 1.0);
        let cosmic = timing.with_cosmic(true);
        assert_relative_eq!(cosmic.nominal_flight_time(SPEED_OF_LIGHT), -1.0);
    }

    #[test]
    fn test_adc_mode_codes() {
        assert_eq!(AdcMode::from_code(0).unwrap(), AdcMode::Standard);
        assert_eq!(AdcMode::from_code(3).unwrap(), AdcMode::SampleIntegralDynamicPedestal);
        assert!(AdcMode::from_code(7).is_err());
    }
}
